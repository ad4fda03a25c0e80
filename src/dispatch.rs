use tracing::{debug, trace};

use crate::client::{MetricSink, MetricValue, SinkError};
use crate::config::{MetricConfig, MetricKind, PluginConfig, StatType};
use crate::event::TransactionEvent;
use crate::name::{builtin_stat, compose_tags, normalize_api_name, NamePrefix};

/// Run every configured metric for one transaction against the sink, in
/// configuration order, then give the sink back. Entries are independent:
/// a failed emission is logged and the loop moves on, so metric loss stays
/// local to one entry.
pub fn dispatch_transaction<S: MetricSink>(config: &PluginConfig, event: &TransactionEvent, sink: S) {
    let api_name = normalize_api_name(&event.api_name);
    let prefix = NamePrefix::new(&api_name, config.tag_api_name);
    for entry in &config.metrics {
        let tags = compose_tags(&entry.tags, config.tag_api_name.then_some(api_name.as_str()));
        if let Err(err) = emit_entry(entry, &prefix, event, &sink, &tags) {
            debug!("Got error emitting statsd metric {:?}, was: {err}", entry.name);
        }
    }
    sink.release();
}

/// One configured entry against one event: the specialized kinds get their
/// own behavior, everything else goes through the generic built-in table.
fn emit_entry<S: MetricSink>(
    entry: &MetricConfig,
    prefix: &NamePrefix,
    event: &TransactionEvent,
    sink: &S,
    tags: &[String],
) -> Result<(), SinkError> {
    match entry.name {
        MetricKind::StatusCount => emit_status_count(entry, prefix, event, sink, tags),
        MetricKind::UniqueUsers => emit_unique_users(entry, prefix, event, sink, tags),
        MetricKind::RequestPerUser => emit_request_per_user(entry, prefix, event, sink, tags),
        MetricKind::StatusCountPerUser => emit_status_count_per_user(entry, prefix, event, sink, tags),
        MetricKind::Unknown => {
            trace!("unrecognized metric name in config, skipping");
            Ok(())
        }
        kind => emit_builtin(kind, entry, prefix, event, sink, tags),
    }
}

/// Generic passthrough: one emission of the configured stat type, fed by
/// the built-in (name, value) pair. No recognized pair means no emission.
fn emit_builtin<S: MetricSink>(
    kind: MetricKind,
    entry: &MetricConfig,
    prefix: &NamePrefix,
    event: &TransactionEvent,
    sink: &S,
    tags: &[String],
) -> Result<(), SinkError> {
    let Some((stat, value)) = builtin_stat(kind, prefix, event) else {
        return Ok(());
    };
    let Some(stat_type) = entry.stat_type else {
        debug!("no stat_type configured for {kind:?}, skipping");
        return Ok(());
    };
    sink.emit(&stat, &value, stat_type, entry.sample_rate, tags)
}

/// Two counters per call, a per-code one and a rolling total, so one entry
/// feeds both code-level and aggregate dashboards.
fn emit_status_count<S: MetricSink>(
    entry: &MetricConfig,
    prefix: &NamePrefix,
    event: &TransactionEvent,
    sink: &S,
    tags: &[String],
) -> Result<(), SinkError> {
    let one = MetricValue::Count(1);
    let per_code = prefix.stat(&format!("request.status.{}", event.response.status_code));
    sink.emit(&per_code, &one, StatType::Counter, entry.sample_rate, tags)?;
    let total = prefix.stat("request.status.total");
    sink.emit(&total, &one, StatType::Counter, entry.sample_rate, tags)
}

fn emit_unique_users<S: MetricSink>(
    entry: &MetricConfig,
    prefix: &NamePrefix,
    event: &TransactionEvent,
    sink: &S,
    tags: &[String],
) -> Result<(), SinkError> {
    let Some(identity) = resolve_identity(entry, event) else {
        return Ok(());
    };
    let stat = prefix.stat("user.uniques");
    // Sets are exact, never sampled.
    sink.emit(&stat, &MetricValue::Identity(identity), StatType::Set, None, tags)
}

fn emit_request_per_user<S: MetricSink>(
    entry: &MetricConfig,
    prefix: &NamePrefix,
    event: &TransactionEvent,
    sink: &S,
    tags: &[String],
) -> Result<(), SinkError> {
    let Some(identity) = resolve_identity(entry, event) else {
        return Ok(());
    };
    let stat = prefix.stat(&format!("user.{identity}.request.count"));
    sink.emit(&stat, &MetricValue::Count(1), StatType::Counter, entry.sample_rate, tags)
}

fn emit_status_count_per_user<S: MetricSink>(
    entry: &MetricConfig,
    prefix: &NamePrefix,
    event: &TransactionEvent,
    sink: &S,
    tags: &[String],
) -> Result<(), SinkError> {
    let Some(identity) = resolve_identity(entry, event) else {
        return Ok(());
    };
    let one = MetricValue::Count(1);
    let per_code = prefix.stat(&format!(
        "user.{identity}.request.status.{}",
        event.response.status_code
    ));
    sink.emit(&per_code, &one, StatType::Counter, entry.sample_rate, tags)?;
    let total = prefix.stat(&format!("user.{identity}.request.status.total"));
    sink.emit(&total, &one, StatType::Counter, entry.sample_rate, tags)
}

/// Identity for a consumer-scoped entry. Anonymous traffic, an unset
/// consumer field, an empty resolution or a missing selector all mean
/// "this dimension is absent": no emission, not an error.
fn resolve_identity(entry: &MetricConfig, event: &TransactionEvent) -> Option<String> {
    let Some(identifier) = entry.consumer_identifier else {
        debug!("no consumer_identifier configured for {:?}, skipping", entry.name);
        return None;
    };
    identifier
        .resolve(event.consumer.as_ref())
        .filter(|identity| !identity.is_empty())
}
