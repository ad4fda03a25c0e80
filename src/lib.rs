//! statgate handles statsd metrics reporting for gateway transactions.
//! The library takes one completed request/response exchange at a time and
//! turns it into the set of named, typed measurements the configuration
//! asks for, emitted over UDP in dogstatsd format. The expensive part never
//! runs on the request path: the [Dispatcher](worker::Dispatcher) hands
//! each transaction to a worker thread, and a metric that fails or makes no
//! sense for a given transaction never takes the others down with it.
//!
//! ### Example: deferred dispatch off the request path
//!
//! ```no_run
//! use statgate::*;
//!
//! let dispatcher = Dispatcher::start(PluginConfig::default());
//! // ... the gateway serves a request, then hands over the facts:
//! let event = TransactionEvent {
//!     api_name: "orders.v2".to_string(),
//!     consumer: None,
//!     request: RequestInfo { size_bytes: 512 },
//!     response: ResponseInfo { size_bytes: 2048, status_code: 200 },
//!     latencies: Latencies { total_ms: 40.5, upstream_ms: 31.0, gateway_ms: 9.5 },
//! };
//! dispatcher.log(event);
//! dispatcher.shutdown();
//! ```
//!
//! # Usage
//!
//! ## Configuration
//!
//! A [PluginConfig](config::PluginConfig) holds the ordered list of
//! [MetricConfig](config::MetricConfig) entries to emit per transaction.
//! [PluginConfig::default()](config::PluginConfig) measures everything the
//! engine knows about; hosts with their own configuration schema can
//! deserialize the whole surface with serde instead. Unrecognized metric
//! names load fine and emit nothing, so one config can serve a mixed fleet.
//!
//! With `tag_api_name` off, every stat is prefixed with the normalized api
//! name (`orders_v2.request.count`). With it on, names stay bare and every
//! emission carries an `api_name:orders_v2` dimension tag instead.
//!
//! ## Dispatching directly
//!
//! The deferred worker is the intended entry point, but the dispatch loop
//! is a plain function if the host already owns a background context:
//!
//! ```no_run
//! use statgate::*;
//!
//! # let event = TransactionEvent {
//! #     api_name: "orders".to_string(),
//! #     consumer: None,
//! #     request: RequestInfo { size_bytes: 1 },
//! #     response: ResponseInfo { size_bytes: 1, status_code: 200 },
//! #     latencies: Latencies { total_ms: 1.0, upstream_ms: 0.5, gateway_ms: 0.5 },
//! # };
//! let config = PluginConfig::default();
//! let sink = StatsdSink::connect(&config).expect("couldn't bind a statsd socket");
//! dispatch_transaction(&config, &event, sink);
//! ```
//!
//! ## Failure model
//!
//! Nothing here ever reaches back into request handling. A full queue or a
//! dead worker drops that one transaction's metrics with a single warning;
//! a sink that can't be built drops that one transaction; a single failed
//! emission is logged and the remaining configured metrics still go out.

/// [StatsdSink](client::StatsdSink) is the UDP sink for emitting dogstatsd
/// metrics to a statsd agent, behind the [MetricSink](client::MetricSink)
/// boundary the dispatch loop drives.
pub mod client;
/// The configuration surface: what to measure, how to aggregate it, and
/// which consumer field identifies a caller.
pub mod config;
/// [dispatch_transaction](dispatch::dispatch_transaction) is the engine:
/// one transaction in, zero or more emissions out.
pub mod dispatch;
/// [TransactionEvent](event::TransactionEvent) is the read-only record of
/// one completed exchange.
pub mod event;
/// Name normalization, prefix policy and dimension-tag composition.
pub mod name;
/// [Dispatcher](worker::Dispatcher) keeps dispatch off the request path.
pub mod worker;

pub use client::{MetricSink, MetricValue, SinkError, StatsdSink};
pub use config::*;
pub use dispatch::dispatch_transaction;
pub use event::*;
pub use name::{normalize_api_name, NamePrefix};
pub use worker::{global_dispatcher, DispatchError, Dispatcher};
