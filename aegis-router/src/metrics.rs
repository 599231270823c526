//! Prometheus metrics exposition for the router (spec §4.3 "Metrics").

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, CounterVec, Counter, Encoder,
    Histogram, Registry, TextEncoder,
};

lazy_static! {
    /// Registry all router collectors are registered into. Kept separate
    /// from the global default registry so repeated test-harness startups
    /// never hit a duplicate-registration panic.
    pub static ref REGISTRY: Registry = Registry::new();

    /// Total incoming `/predict` requests.
    pub static ref REQUESTS_TOTAL: Counter = register_counter!(
        "aegis_router_requests_total",
        "Incoming /predict requests"
    )
    .unwrap();

    /// Total physical forward failures (including ones later retried).
    pub static ref FORWARD_FAILURES_TOTAL: Counter = register_counter!(
        "aegis_router_forward_failures_total",
        "Forward attempts that failed"
    )
    .unwrap();

    /// Per-backend selection tally.
    pub static ref BACKEND_CHOSEN_TOTAL: CounterVec = register_counter_vec!(
        "aegis_router_backend_chosen_total",
        "Count of requests forwarded to each backend",
        &["backend"]
    )
    .unwrap();

    /// End-to-end request latency, including a retry if one occurred.
    pub static ref REQUEST_LATENCY_MS: Histogram = register_histogram!(
        "aegis_router_request_latency_ms",
        "End-to-end /predict latency in milliseconds"
    )
    .unwrap();
}

/// Register every collector into [`REGISTRY`]. Idempotent.
pub fn init() {
    REGISTRY.register(Box::new(REQUESTS_TOTAL.clone())).ok();
    REGISTRY
        .register(Box::new(FORWARD_FAILURES_TOTAL.clone()))
        .ok();
    REGISTRY
        .register(Box::new(BACKEND_CHOSEN_TOTAL.clone()))
        .ok();
    REGISTRY
        .register(Box::new(REQUEST_LATENCY_MS.clone()))
        .ok();
}

/// Render the current registry in Prometheus text exposition format.
pub fn render() -> String {
    let metric_families = REGISTRY.gather();
    let mut buf = Vec::new();
    TextEncoder::new().encode(&metric_families, &mut buf).ok();
    String::from_utf8(buf).unwrap_or_default()
}
