//! Configuration for `aegis-autoscaler`: CLI arguments and environment overrides.

use aegis_core::config::{MAX_WEIGHT, MIN_WEIGHT};
use clap::Parser;

/// Reference external autoscaler: polls the manager's `/weights`,
/// computes a normalized override, smooths it against the previous
/// round, clamps, and posts it back (spec §4.4).
#[derive(Parser, Debug, Clone)]
#[command(name = "aegis-autoscaler", about = "Aegis reference autoscaler")]
pub struct Args {
    /// Base URL of the manager's control-plane server.
    #[arg(long, env = "MANAGER_URL", default_value = "http://127.0.0.1:8001")]
    pub manager_url: String,

    /// Poll period, in seconds.
    #[arg(long, default_value_t = 3.0, env = "AUTOSCALER_POLL_SECONDS")]
    pub poll_seconds: f64,

    /// EMA smoothing constant applied to successive target weights.
    #[arg(long, default_value_t = 0.3, env = "AUTOSCALER_SMOOTH_ALPHA")]
    pub smooth_alpha: f64,

    /// Lower clamp bound for posted overrides.
    #[arg(long, default_value_t = MIN_WEIGHT, env = "MIN_WEIGHT")]
    pub min_weight: f64,

    /// Upper clamp bound for posted overrides.
    #[arg(long, default_value_t = MAX_WEIGHT, env = "MAX_WEIGHT")]
    pub max_weight: f64,

    /// Per-request timeout against the manager, in seconds.
    #[arg(long, default_value_t = 3.0)]
    pub request_timeout_seconds: f64,
}
