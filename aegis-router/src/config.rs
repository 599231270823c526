//! Configuration for `aegis-router`: CLI arguments and environment overrides.

use std::net::SocketAddr;

use aegis_core::config::{DEFAULT_MAX_INFLIGHT, DEFAULT_POLL_INTERVAL_MS, MAX_WEIGHT, MIN_WEIGHT};
use clap::Parser;

/// Data-plane router for Aegis: weight-aware backend selection and
/// request forwarding.
#[derive(Parser, Debug, Clone)]
#[command(name = "aegis-router", about = "Aegis weighted request router")]
pub struct Args {
    /// Address to bind the HTTP data-plane server to.
    #[arg(long, default_value = "0.0.0.0:8080", env = "ROUTER_BIND")]
    pub bind: SocketAddr,

    /// Base URL of the manager's control-plane server.
    #[arg(long, env = "MANAGER_URL", default_value = "http://127.0.0.1:8001")]
    pub manager_url: String,

    /// Backend list as repeated `name=url` pairs, e.g.
    /// `--backend backend1=http://127.0.0.1:8101/predict`. Used as the
    /// uniform-fallback candidate set when the manager has never been
    /// reached.
    #[arg(long = "backend", env = "BACKEND_LIST", value_delimiter = ',')]
    pub backends: Vec<String>,

    /// Background weight-poll period, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS, env = "POLL_INTERVAL")]
    pub poll_interval_ms: u64,

    /// Per-attempt weights-fetch timeout, in milliseconds.
    #[arg(long, default_value_t = 2_000, env = "WEIGHTS_TIMEOUT_MS")]
    pub weights_timeout_ms: u64,

    /// Per-attempt forward timeout, in milliseconds.
    #[arg(long, default_value_t = 8_000, env = "FORWARD_TIMEOUT_MS")]
    pub forward_timeout_ms: u64,

    /// Timeout for the fire-and-forget `/record` callback, in milliseconds.
    #[arg(long, default_value_t = 1_000, env = "RECORD_TIMEOUT_MS")]
    pub record_timeout_ms: u64,

    /// Maximum number of concurrently in-flight forwarded requests.
    #[arg(long, default_value_t = DEFAULT_MAX_INFLIGHT, env = "MAX_INFLIGHT")]
    pub max_inflight: usize,

    /// Lower clamp bound, mirrored from the manager for documentation
    /// purposes; the router itself never writes weights.
    #[arg(long, default_value_t = MIN_WEIGHT, env = "MIN_WEIGHT")]
    pub min_weight: f64,

    /// Upper clamp bound, mirrored from the manager.
    #[arg(long, default_value_t = MAX_WEIGHT, env = "MAX_WEIGHT")]
    pub max_weight: f64,
}

/// A parsed `name=url` backend pair.
#[derive(Debug, Clone)]
pub struct BackendSpec {
    /// Backend name.
    pub name: String,
    /// Backend inference endpoint.
    pub url: String,
}

impl Args {
    /// Parse the configured `--backend name=url` pairs, used only for the
    /// uniform-fallback candidate set (spec §4.3).
    pub fn parsed_backends(&self) -> Result<Vec<BackendSpec>, String> {
        self.backends
            .iter()
            .map(|raw| {
                raw.split_once('=')
                    .map(|(name, url)| BackendSpec {
                        name: name.trim().to_string(),
                        url: url.trim().to_string(),
                    })
                    .ok_or_else(|| format!("invalid --backend entry '{raw}', expected name=url"))
            })
            .collect()
    }
}
