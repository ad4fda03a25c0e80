use statgate::*;

fn transaction(status_code: u16) -> TransactionEvent {
    TransactionEvent {
        api_name: "orders.v2".to_string(),
        consumer: None,
        request: RequestInfo { size_bytes: 512 },
        response: ResponseInfo {
            size_bytes: 2048,
            status_code,
        },
        latencies: Latencies {
            total_ms: 40.5,
            upstream_ms: 31.0,
            gateway_ms: 9.5,
        },
    }
}

pub fn main() {
    // Override for local testing
    std::env::set_var(statgate::client::STATSD_HOST_ENV, "0.0.0.0");
    let config = PluginConfig::default().with_tag_api_name(true);
    let dispatcher = Dispatcher::start(config);
    for status_code in [200, 200, 404, 500] {
        // log() never blocks the caller; a full queue drops the event
        // with a warning instead.
        dispatcher.log(transaction(status_code));
        println!("Queued transaction with status {status_code}!");
        std::thread::sleep(std::time::Duration::from_millis(3000));
    }
    dispatcher.shutdown();
    println!("Drained the queue and stopped the worker!");
}
