//! Tunable constants shared by every Aegis binary.
//!
//! These are "policy choices, not invariants" per the design notes: the
//! defaults mirror the original Python source, but every binary crate
//! exposes them as CLI/env overrides rather than baking them in.

/// Smoothing constant used when a backend has no per-backend override.
pub const DEFAULT_EWMA_ALPHA: f64 = 0.2;

/// Bounds latency-derived weight as `ewma` approaches zero.
pub const WEIGHT_EPSILON_S: f64 = 1e-3;

/// Weight floor assigned to an unhealthy backend so it is only chosen
/// when no healthy candidate exists.
pub const UNHEALTHY_WEIGHT_FLOOR: f64 = 1e-4;

/// Multiplier applied to the existing EWMA on a failed probe, so
/// recovery after a health flap is gradual rather than instantaneous.
pub const UNHEALTHY_DECAY_PENALTY: f64 = 1.5;

/// Seed latency (seconds) used when a backend is marked unhealthy before
/// it has ever produced a sample.
pub const DEFAULT_SEED_LATENCY_S: f64 = 1.0;

/// Lower clamp bound for manually-overridden weights.
pub const MIN_WEIGHT: f64 = 0.05;

/// Upper clamp bound for manually-overridden weights.
pub const MAX_WEIGHT: f64 = 100.0;

/// A flat-shape weight at or below this value is treated as unhealthy by
/// a router parsing the override wire shape (spec §4.3 step 1).
pub const HEALTH_FLOOR: f64 = 1e-3;

/// Default manager probe period.
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 1_000;

/// Default router weight-poll period.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default per-attempt probe timeout.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

/// Default weights-fetch timeout.
pub const DEFAULT_WEIGHTS_TIMEOUT_MS: u64 = 2_000;

/// Default end-to-end forward timeout.
pub const DEFAULT_FORWARD_TIMEOUT_MS: u64 = 8_000;

/// Default best-effort record-post timeout.
pub const DEFAULT_RECORD_TIMEOUT_MS: u64 = 1_000;

/// Default bound on in-flight forwarded requests.
pub const DEFAULT_MAX_INFLIGHT: usize = 512;

/// Clamp a manually-overridden weight to `[MIN_WEIGHT, MAX_WEIGHT]`.
pub fn clamp_weight(w: f64) -> f64 {
    w.clamp(MIN_WEIGHT, MAX_WEIGHT)
}
