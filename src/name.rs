use crate::client::MetricValue;
use crate::config::MetricKind;
use crate::event::TransactionEvent;

/// Dots in the route/service name would read as statsd name segments, so
/// they become underscores once, up front, and every derived name and tag
/// uses the same form.
pub fn normalize_api_name(api_name: &str) -> String {
    api_name.replace('.', "_")
}

/// The per-dispatch name prefix policy. With `tag_api_name` the api moves
/// out of the name and into a dimension tag, so the prefix is empty;
/// otherwise every stat leads with `<api>.`.
#[derive(Clone, Debug)]
pub struct NamePrefix(String);

impl NamePrefix {
    pub fn new(api_name: &str, tag_api_name: bool) -> Self {
        if tag_api_name {
            Self(String::new())
        } else {
            Self(format!("{api_name}."))
        }
    }

    pub fn stat(&self, suffix: &str) -> String {
        format!("{}{}", self.0, suffix)
    }
}

/// The six built-in stats: fixed name plus the event field that feeds it.
/// Specialized and unknown kinds have no entry here.
pub(crate) fn builtin_stat(
    kind: MetricKind,
    prefix: &NamePrefix,
    event: &TransactionEvent,
) -> Option<(String, MetricValue)> {
    let (suffix, value) = match kind {
        MetricKind::RequestSize => ("request.size", MetricValue::from(event.request.size_bytes as i64)),
        MetricKind::ResponseSize => ("response.size", MetricValue::from(event.response.size_bytes as i64)),
        MetricKind::Latency => ("latency", MetricValue::from(event.latencies.total_ms)),
        MetricKind::UpstreamLatency => ("upstream_latency", MetricValue::from(event.latencies.upstream_ms)),
        MetricKind::KongLatency => ("kong_latency", MetricValue::from(event.latencies.gateway_ms)),
        MetricKind::RequestCount => ("request.count", MetricValue::from(1i64)),
        _ => return None,
    };
    Some((prefix.stat(suffix), value))
}

/// Final dimension-tag sequence for one emission: the entry's static tags,
/// then the derived `api_name` tag when that mode is on. The static slice
/// belongs to the long-lived config, so this always copies.
pub(crate) fn compose_tags(static_tags: &[String], api_name: Option<&str>) -> Vec<String> {
    let mut tags = static_tags.to_vec();
    if let Some(api_name) = api_name {
        tags.push(format!("api_name:{api_name}"));
    }
    tags
}
