use std::env;

use derive_more::{Display, From};
use dogstatsd::{Client, DogstatsdError, Options};
use rand::Rng;
use thiserror::Error;
use tracing::trace;

use crate::config::{PluginConfig, StatType};

pub const STATSD_HOST_ENV: &str = "STATSD_HOST";
pub const STATSD_PORT_ENV: &str = "STATSD_PORT";
const DEFAULT_ORIGIN: &str = "0.0.0.0:0";
// Port 8125(UDP) is the statsd convention; 8126 is APM, not us.

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "8125";

/// What a single emission carries: a numeric delta/sample or, for set
/// stats, an opaque identity token.
#[derive(Clone, Debug, Display, From, PartialEq)]
pub enum MetricValue {
    #[display("{_0}")]
    Count(i64),
    #[display("{_0}")]
    Measure(f64),
    #[display("{_0}")]
    Identity(String),
}

impl MetricValue {
    /// Integral view for counter/timer payloads. Identities have none.
    pub fn as_count(&self) -> Option<i64> {
        match self {
            MetricValue::Count(count) => Some(*count),
            MetricValue::Measure(value) => Some(value.round() as i64),
            MetricValue::Identity(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    /// The dogstatsd client couldn't build its socket or send a packet.
    #[error("statsd transport error: {0}")]
    Transport(#[from] DogstatsdError),
    /// An identity value was offered to a numeric aggregation kind.
    #[error("can't send {value} as {stat_type:?} for stat {stat}")]
    InvalidValue {
        stat: String,
        stat_type: StatType,
        value: MetricValue,
    },
    /// Failure reported by a non-dogstatsd sink implementation.
    #[error("sink error: {0}")]
    Other(String),
}

/// The emission interface the dispatch loop drives. One sink is acquired
/// per transaction and [release](MetricSink::release)d exactly once when
/// its dispatch finishes, however many emissions failed.
pub trait MetricSink {
    fn emit(
        &self,
        stat: &str,
        value: &MetricValue,
        stat_type: StatType,
        sample_rate: Option<f64>,
        tags: &[String],
    ) -> Result<(), SinkError>;

    /// Give back the scoped connection. Consumes the sink so a dispatch
    /// can't keep emitting past it.
    fn release(self);
}

/// UDP statsd sink over a [dogstatsd::Client]. Cheap enough to construct
/// per dispatch; the socket goes away with it.
pub struct StatsdSink {
    client: Client,
}

impl StatsdSink {
    /// Resolve the agent endpoint (config override, then `STATSD_HOST` /
    /// `STATSD_PORT`, then localhost:8125) and bind a socket for it.
    pub fn connect(config: &PluginConfig) -> Result<Self, SinkError> {
        let statsd_host = config
            .host
            .clone()
            .or_else(|| env::var(STATSD_HOST_ENV).ok())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let statsd_port = config
            .port
            .map(|p| p.to_string())
            .or_else(|| env::var(STATSD_PORT_ENV).ok())
            .unwrap_or_else(|| DEFAULT_PORT.to_string());
        let options = Options {
            socket_path: None,
            batching_options: None,
            default_tags: vec![],
            from_addr: DEFAULT_ORIGIN.to_string(),
            to_addr: format!("{}:{}", statsd_host, statsd_port),
            namespace: String::new(),
        };
        let client = Client::new(options)?;
        Ok(StatsdSink { client })
    }

    fn count_payload(
        stat: &str,
        value: &MetricValue,
        stat_type: StatType,
    ) -> Result<i64, SinkError> {
        value.as_count().ok_or_else(|| SinkError::InvalidValue {
            stat: stat.to_string(),
            stat_type,
            value: value.clone(),
        })
    }
}

impl MetricSink for StatsdSink {
    fn emit(
        &self,
        stat: &str,
        value: &MetricValue,
        stat_type: StatType,
        sample_rate: Option<f64>,
        tags: &[String],
    ) -> Result<(), SinkError> {
        if !should_send(sample_rate) {
            return Ok(());
        }
        match stat_type {
            StatType::Counter => {
                let delta = Self::count_payload(stat, value, stat_type)?;
                self.client.count(stat, delta, tags)?;
            }
            StatType::Timer => {
                let millis = Self::count_payload(stat, value, stat_type)?;
                self.client.timing(stat, millis, tags)?;
            }
            StatType::Gauge => self.client.gauge(stat, value.to_string(), tags)?,
            StatType::Histogram => self.client.histogram(stat, value.to_string(), tags)?,
            StatType::Set => self.client.set(stat, value.to_string(), tags)?,
        }
        Ok(())
    }

    fn release(self) {
        trace!("releasing statsd socket");
    }
}

/// The dogstatsd crate doesn't encode `|@rate` on the wire, so the rate is
/// applied here as a random gate, the way relay's statsd client does it.
fn should_send(sample_rate: Option<f64>) -> bool {
    match sample_rate {
        None => true,
        Some(rate) if rate >= 1.0 => true,
        Some(rate) if rate <= 0.0 => false,
        Some(rate) => rand::rng().random::<f64>() <= rate,
    }
}
