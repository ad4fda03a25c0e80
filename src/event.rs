use serde::Deserialize;

/// Everything the gateway knows about one completed request/response
/// exchange. Produced by the host's serializer once per transaction and
/// consumed read-only by the dispatch loop.
#[derive(Clone, Debug, Deserialize)]
pub struct TransactionEvent {
    /// Logical route/service identifier. May contain dots; names derived
    /// from it use the normalized (underscored) form.
    pub api_name: String,
    /// The identified caller, when the gateway authenticated one.
    #[serde(default)]
    pub consumer: Option<Consumer>,
    pub request: RequestInfo,
    pub response: ResponseInfo,
    pub latencies: Latencies,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Consumer {
    pub id: String,
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RequestInfo {
    pub size_bytes: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ResponseInfo {
    pub size_bytes: u64,
    pub status_code: u16,
}

/// Millisecond timings for the exchange. `gateway_ms` is the share spent
/// inside the gateway itself, `upstream_ms` the share spent waiting on the
/// upstream service.
#[derive(Clone, Debug, Deserialize)]
pub struct Latencies {
    pub total_ms: f64,
    pub upstream_ms: f64,
    pub gateway_ms: f64,
}
