use statgate::*;

pub fn main() {
    // Override for local testing
    std::env::set_var(statgate::client::STATSD_HOST_ENV, "0.0.0.0");
    let config = PluginConfig::default();
    let event = TransactionEvent {
        api_name: "orders.v2".to_string(),
        consumer: Some(Consumer {
            id: "abc-123".to_string(),
            custom_id: Some("team-42".to_string()),
            username: Some("alice".to_string()),
        }),
        request: RequestInfo { size_bytes: 512 },
        response: ResponseInfo {
            size_bytes: 2048,
            status_code: 200,
        },
        latencies: Latencies {
            total_ms: 40.5,
            upstream_ms: 31.0,
            gateway_ms: 9.5,
        },
    };
    loop {
        // One scoped sink per transaction, released by the dispatch.
        let sink = StatsdSink::connect(&config).expect("Failed to open statsd sink!");
        dispatch_transaction(&config, &event, sink);
        println!("Dispatched transaction!");
        std::thread::sleep(std::time::Duration::from_millis(3000));
    }
}
