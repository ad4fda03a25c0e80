use serde::Deserialize;

use crate::event::Consumer;

/// Aggregation kinds understood by the statsd backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatType {
    Counter,
    Gauge,
    Set,
    Timer,
    Histogram,
}

/// The configurable measurement kinds. Unrecognized names deserialize to
/// [Unknown](MetricKind::Unknown) and dispatch to nothing, so configs
/// written for newer gateways still load here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    RequestSize,
    ResponseSize,
    Latency,
    UpstreamLatency,
    KongLatency,
    RequestCount,
    StatusCount,
    UniqueUsers,
    RequestPerUser,
    StatusCountPerUser,
    #[serde(other)]
    Unknown,
}

/// Which field of the consumer record identifies the caller. An
/// out-of-set selector string is a deserialization error, never a guess.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerIdentifier {
    ConsumerId,
    CustomId,
    Username,
}

impl ConsumerIdentifier {
    /// Extract the caller identity from the transaction's consumer record.
    /// `None` when the transaction is anonymous or the selected field is
    /// unset. Consumer ids swap `-` for `_` to stay a single collector-safe
    /// name segment.
    pub fn resolve(&self, consumer: Option<&Consumer>) -> Option<String> {
        let consumer = consumer?;
        match self {
            ConsumerIdentifier::ConsumerId => Some(consumer.id.replace('-', "_")),
            ConsumerIdentifier::CustomId => consumer.custom_id.clone(),
            ConsumerIdentifier::Username => consumer.username.clone(),
        }
    }
}

/// One configured measurement. The list order in [PluginConfig] is the
/// dispatch order; duplicates are allowed and emit independently.
#[derive(Clone, Debug, Deserialize)]
pub struct MetricConfig {
    pub name: MetricKind,
    #[serde(default)]
    pub consumer_identifier: Option<ConsumerIdentifier>,
    /// Forwarded opaquely to the sink. Sets ignore it, they are exact.
    #[serde(default)]
    pub sample_rate: Option<f64>,
    /// Static dimension tags, `key:value` strings. The dispatch loop never
    /// mutates this sequence, it copies before extending.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Aggregation kind for the generic built-in stats. The specialized
    /// kinds carry their own.
    #[serde(default)]
    pub stat_type: Option<StatType>,
}

impl MetricConfig {
    pub fn new(name: MetricKind) -> Self {
        Self {
            name,
            consumer_identifier: None,
            sample_rate: None,
            tags: Vec::new(),
            stat_type: None,
        }
    }
    pub fn with_stat_type(mut self, stat_type: StatType) -> Self {
        self.stat_type = Some(stat_type);
        self
    }
    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }
    pub fn with_consumer_identifier(mut self, identifier: ConsumerIdentifier) -> Self {
        self.consumer_identifier = Some(identifier);
        self
    }
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        S: AsRef<str>,
        I: IntoIterator<Item = S>,
    {
        self.tags = tags.into_iter().map(|t| t.as_ref().to_string()).collect();
        self
    }
}

/// Plugin-scoped configuration: what to measure plus where to send it.
/// Loaded once per configuration activation and read-only afterwards.
#[derive(Clone, Debug, Deserialize)]
pub struct PluginConfig {
    /// When set, names lose their `<api>.` prefix and every emission gains
    /// an `api_name:<api>` dimension tag instead.
    #[serde(default)]
    pub tag_api_name: bool,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricConfig>,
    /// Statsd agent host override. Falls back to `STATSD_HOST`, then
    /// 127.0.0.1.
    #[serde(default)]
    pub host: Option<String>,
    /// Statsd agent port override. Falls back to `STATSD_PORT`, then 8125.
    #[serde(default)]
    pub port: Option<u16>,
    /// Bound on the deferred-dispatch queue. Falls back to
    /// `STATGATE_QUEUE_CAPACITY`, then 1024.
    #[serde(default)]
    pub queue_capacity: Option<usize>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            tag_api_name: false,
            metrics: default_metrics(),
            host: None,
            port: None,
            queue_capacity: None,
        }
    }
}

impl PluginConfig {
    pub fn with_metrics(mut self, metrics: Vec<MetricConfig>) -> Self {
        self.metrics = metrics;
        self
    }
    pub fn with_tag_api_name(mut self, tag_api_name: bool) -> Self {
        self.tag_api_name = tag_api_name;
        self
    }
}

/// The out-of-the-box measurement set: every kind, counters at full sample
/// rate, consumer-scoped kinds keyed by custom id.
fn default_metrics() -> Vec<MetricConfig> {
    use ConsumerIdentifier::CustomId;
    use MetricKind::*;
    use StatType::{Counter, Set, Timer};
    vec![
        MetricConfig::new(RequestCount).with_stat_type(Counter).with_sample_rate(1.0),
        MetricConfig::new(Latency).with_stat_type(Timer),
        MetricConfig::new(RequestSize).with_stat_type(Timer),
        MetricConfig::new(StatusCount).with_sample_rate(1.0),
        MetricConfig::new(ResponseSize).with_stat_type(Timer),
        MetricConfig::new(UniqueUsers).with_stat_type(Set).with_consumer_identifier(CustomId),
        MetricConfig::new(RequestPerUser).with_sample_rate(1.0).with_consumer_identifier(CustomId),
        MetricConfig::new(UpstreamLatency).with_stat_type(Timer),
        MetricConfig::new(KongLatency).with_stat_type(Timer),
        MetricConfig::new(StatusCountPerUser).with_sample_rate(1.0).with_consumer_identifier(CustomId),
    ]
}

pub(crate) fn get_env_or_fallback(env_var: &str, fallback: u64) -> u64 {
    match std::env::var(env_var) {
        Err(_) => fallback,
        Ok(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
            tracing::debug!("Couldn't parse {env_var} as a u64, falling back to default.");
            fallback
        }),
    }
}
