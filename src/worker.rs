use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{debug, warn};

use crate::client::{MetricSink, SinkError, StatsdSink};
use crate::config::{get_env_or_fallback, PluginConfig};
use crate::dispatch::dispatch_transaction;
use crate::event::TransactionEvent;

const DEFAULT_QUEUE_CAPACITY: u64 = 1024;
const QUEUE_CAPACITY_ENV_VAR: &str = "STATGATE_QUEUE_CAPACITY";

static GLOBAL_DISPATCHER: OnceCell<Dispatcher> = OnceCell::new();

/// Process-wide dispatcher running the default configuration. Hosts that
/// load their own [PluginConfig] should hold a [Dispatcher] of their own
/// instead.
pub fn global_dispatcher() -> &'static Dispatcher {
    GLOBAL_DISPATCHER.get_or_init(|| Dispatcher::start(PluginConfig::default()))
}

/// Why a transaction's metrics were not scheduled. Either way the request
/// path moves on; this is the bounded data-loss mode, not a fault.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("deferred-dispatch queue is full")]
    QueueFull,
    #[error("dispatch worker is gone")]
    WorkerGone,
}

/// Hands completed transactions to a worker thread so no emission work
/// runs on the path that served the request. The queue is bounded; when
/// it is full the event is refused rather than making the caller wait.
pub struct Dispatcher {
    sender: Sender<TransactionEvent>,
    worker: JoinHandle<()>,
}

impl Dispatcher {
    /// Start a worker that opens a fresh statsd socket per transaction.
    pub fn start(config: PluginConfig) -> Self {
        let sink_config = config.clone();
        Self::with_sink_factory(config, move || StatsdSink::connect(&sink_config))
    }

    /// Start a worker with a custom sink source. The factory runs once per
    /// transaction (scoped-connection discipline); a factory error drops
    /// that transaction's metrics and nothing else.
    pub fn with_sink_factory<S, F>(config: PluginConfig, factory: F) -> Self
    where
        S: MetricSink + 'static,
        F: Fn() -> Result<S, SinkError> + Send + 'static,
    {
        let capacity = config.queue_capacity.unwrap_or_else(|| {
            get_env_or_fallback(QUEUE_CAPACITY_ENV_VAR, DEFAULT_QUEUE_CAPACITY) as usize
        });
        let (sender, receiver) = bounded(capacity);
        let worker = Self::run(config, receiver, factory);
        Self { sender, worker }
    }

    fn run<S, F>(
        config: PluginConfig,
        receiver: Receiver<TransactionEvent>,
        factory: F,
    ) -> JoinHandle<()>
    where
        S: MetricSink + 'static,
        F: Fn() -> Result<S, SinkError> + Send + 'static,
    {
        std::thread::spawn(move || {
            for event in receiver {
                match factory() {
                    Ok(sink) => dispatch_transaction(&config, &event, sink),
                    Err(err) => {
                        warn!("couldn't open a statsd sink, dropping metrics for one transaction: {err}");
                    }
                }
            }
            debug!("dispatch worker shutting down");
        })
    }

    /// Non-blocking handoff from the request path.
    pub fn submit(&self, event: TransactionEvent) -> Result<(), DispatchError> {
        self.sender.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => DispatchError::QueueFull,
            TrySendError::Disconnected(_) => DispatchError::WorkerGone,
        })
    }

    /// Fire-and-forget submit: a refused handoff is reported once and the
    /// transaction's metrics are dropped.
    pub fn log(&self, event: TransactionEvent) {
        if let Err(err) = self.submit(event) {
            warn!("dropping metrics for one transaction: {err}");
        }
    }

    /// Let the worker drain whatever is queued, then stop it.
    pub fn shutdown(self) {
        let Dispatcher { sender, worker } = self;
        drop(sender);
        let _ = worker.join();
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::client::testing::MockSink;
    use crate::config::{MetricConfig, MetricKind, StatType};
    use crate::event::{Latencies, RequestInfo, ResponseInfo};

    fn event() -> TransactionEvent {
        TransactionEvent {
            api_name: "orders".to_string(),
            consumer: None,
            request: RequestInfo { size_bytes: 100 },
            response: ResponseInfo {
                size_bytes: 100,
                status_code: 200,
            },
            latencies: Latencies {
                total_ms: 5.0,
                upstream_ms: 4.0,
                gateway_ms: 1.0,
            },
        }
    }

    fn one_counter_config(queue_capacity: usize) -> PluginConfig {
        let mut config = PluginConfig::default().with_metrics(vec![
            MetricConfig::new(MetricKind::RequestCount).with_stat_type(StatType::Counter),
        ]);
        config.queue_capacity = Some(queue_capacity);
        config
    }

    #[test]
    fn test_worker_dispatches_submitted_events() {
        let sink = MockSink::new();
        let factory_sink = sink.clone();
        let dispatcher =
            Dispatcher::with_sink_factory(one_counter_config(8), move || Ok(factory_sink.clone()));
        dispatcher.submit(event()).expect("first submit");
        dispatcher.submit(event()).expect("second submit");
        dispatcher.shutdown();
        let emissions = sink.emissions();
        assert_eq!(emissions.len(), 2);
        assert!(emissions.iter().all(|e| e.stat == "orders.request.count"));
        // One scoped sink per transaction, each released once.
        assert_eq!(sink.release_count(), 2);
    }

    #[test]
    fn test_full_queue_refuses_without_blocking() {
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(8);
        let sink = MockSink::new();
        let factory_sink = sink.clone();
        let dispatcher = Dispatcher::with_sink_factory(one_counter_config(1), move || {
            started_tx.send(()).expect("started gate");
            gate_rx.recv().expect("dispatch gate");
            Ok(factory_sink.clone())
        });
        dispatcher.submit(event()).expect("worker takes the first event");
        started_rx.recv().expect("worker is inside the factory");
        dispatcher.submit(event()).expect("second event fills the queue");
        let refused = dispatcher.submit(event());
        assert!(matches!(refused, Err(DispatchError::QueueFull)));
        // The refused path is also what log() reports-and-drops through.
        dispatcher.log(event());
        gate_tx.send(()).expect("release first dispatch");
        gate_tx.send(()).expect("release second dispatch");
        dispatcher.shutdown();
        assert_eq!(sink.emissions().len(), 2);
        assert_eq!(sink.release_count(), 2);
    }

    #[test]
    fn test_sink_factory_failure_drops_only_that_transaction() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory_calls = calls.clone();
        let sink = MockSink::new();
        let factory_sink = sink.clone();
        let dispatcher = Dispatcher::with_sink_factory(one_counter_config(8), move || {
            if factory_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SinkError::Other("agent unreachable".to_string()))
            } else {
                Ok(factory_sink.clone())
            }
        });
        dispatcher.submit(event()).expect("first submit");
        dispatcher.submit(event()).expect("second submit");
        dispatcher.shutdown();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sink.emissions().len(), 1);
        assert_eq!(sink.release_count(), 1);
    }

    #[test]
    fn test_global_dispatcher_is_a_singleton() {
        assert!(std::ptr::eq(global_dispatcher(), global_dispatcher()));
    }
}
