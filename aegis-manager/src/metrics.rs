//! Prometheus metrics exposition for the manager (spec §6 `GET /metrics`).

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_gauge_vec, Counter, Encoder, GaugeVec, Registry, TextEncoder,
};

lazy_static! {
    /// Registry all manager collectors are registered into. Kept separate
    /// from the global default registry so repeated test-harness startups
    /// never hit a duplicate-registration panic.
    pub static ref REGISTRY: Registry = Registry::new();

    /// Per-backend normalized weight (derived or override).
    pub static ref BACKEND_WEIGHT: GaugeVec = register_gauge_vec!(
        "aegis_backend_weight",
        "Backend weight, derived or manually overridden",
        &["backend"]
    )
    .unwrap();

    /// Per-backend EWMA latency in milliseconds.
    pub static ref BACKEND_LAT_MS: GaugeVec = register_gauge_vec!(
        "aegis_backend_lat_ms",
        "Backend EWMA latency in milliseconds",
        &["backend"]
    )
    .unwrap();

    /// Per-backend health, 1.0 healthy / 0.0 unhealthy.
    pub static ref BACKEND_HEALTH: GaugeVec = register_gauge_vec!(
        "aegis_backend_health",
        "Backend health, 1=healthy 0=unhealthy",
        &["backend"]
    )
    .unwrap();

    /// Count of `/record` posts accepted.
    pub static ref RECORD_TOTAL: Counter = register_counter!(
        "aegis_manager_record_total",
        "Records accepted by the manager"
    )
    .unwrap();

    /// Count of `/record` posts rejected as malformed.
    pub static ref RECORD_ERRORS_TOTAL: Counter = register_counter!(
        "aegis_manager_record_errors_total",
        "Malformed records rejected by the manager"
    )
    .unwrap();
}

/// Register every collector into [`REGISTRY`]. Idempotent: safe to call
/// once at startup before the server begins accepting connections.
pub fn init() {
    REGISTRY
        .register(Box::new(BACKEND_WEIGHT.clone()))
        .ok();
    REGISTRY.register(Box::new(BACKEND_LAT_MS.clone())).ok();
    REGISTRY.register(Box::new(BACKEND_HEALTH.clone())).ok();
    REGISTRY.register(Box::new(RECORD_TOTAL.clone())).ok();
    REGISTRY
        .register(Box::new(RECORD_ERRORS_TOTAL.clone()))
        .ok();
}

/// Render the current registry in Prometheus text exposition format.
pub fn render() -> String {
    let metric_families = REGISTRY.gather();
    let mut buf = Vec::new();
    TextEncoder::new().encode(&metric_families, &mut buf).ok();
    String::from_utf8(buf).unwrap_or_default()
}

/// Recompute every gauge from the current registry snapshot and override
/// map. Called after every probe sweep, `/record`, and `/weights` write.
///
/// `aegis_backend_lat_ms` and `aegis_backend_health` always reflect actual
/// backend telemetry. `aegis_backend_weight` reflects whichever weight is
/// currently authoritative: the manual override verbatim when present
/// (spec invariant I3: overrides "are themselves reflected into any
/// metrics gauges"), otherwise the *normalized* derived weight (spec
/// §4.2's `inv / total` publication rule — distinct from the raw,
/// unnormalized weight `aegis-core::derived_weight` used by the router's
/// own selection math).
pub fn publish(registry: &aegis_core::BackendRegistry, overrides: &aegis_core::ManualOverrideMap) {
    let snapshot = registry.snapshot();

    for (name, s) in &snapshot {
        BACKEND_LAT_MS
            .with_label_values(&[name])
            .set(s.ewma_latency_s.unwrap_or(0.0) * 1000.0);
        BACKEND_HEALTH
            .with_label_values(&[name])
            .set(if s.healthy { 1.0 } else { 0.0 });
    }

    let ov = overrides.get();
    if !ov.is_empty() {
        for (name, w) in ov.iter() {
            BACKEND_WEIGHT.with_label_values(&[name]).set(*w);
        }
        return;
    }

    let raw: Vec<(String, f64)> = snapshot
        .values()
        .map(|s| {
            (
                s.name.clone(),
                aegis_core::derived_weight(s.ewma_latency_s, s.healthy),
            )
        })
        .collect();
    let total: f64 = raw.iter().map(|(_, w)| w).sum();
    let n = raw.len().max(1) as f64;
    for (name, inv) in &raw {
        let w = if total > 0.0 { inv / total } else { 1.0 / n };
        BACKEND_WEIGHT.with_label_values(&[name]).set(w);
    }
}
