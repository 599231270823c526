//! Configuration for `aegis-manager`: CLI arguments and environment overrides.

use std::net::SocketAddr;

use aegis_core::config::{
    DEFAULT_EWMA_ALPHA, DEFAULT_PROBE_INTERVAL_MS, DEFAULT_PROBE_TIMEOUT_MS, MAX_WEIGHT,
    MIN_WEIGHT,
};
use clap::Parser;

/// Control-plane manager for Aegis: EWMA/health state machine, weight
/// publication, and probe loop.
#[derive(Parser, Debug, Clone)]
#[command(name = "aegis-manager", about = "Aegis weight & telemetry manager")]
pub struct Args {
    /// Address to bind the HTTP control-plane server to.
    #[arg(long, default_value = "0.0.0.0:8001", env = "MANAGER_BIND")]
    pub bind: SocketAddr,

    /// Backend list as repeated `name=url` pairs, e.g.
    /// `--backend backend1=http://127.0.0.1:8101/predict`.
    #[arg(long = "backend", env = "BACKEND_LIST", value_delimiter = ',')]
    pub backends: Vec<String>,

    /// EWMA smoothing constant.
    #[arg(long, default_value_t = DEFAULT_EWMA_ALPHA, env = "EWMA_ALPHA")]
    pub ewma_alpha: f64,

    /// Probe sweep period, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_PROBE_INTERVAL_MS, env = "PROBE_INTERVAL")]
    pub probe_interval_ms: u64,

    /// Per-attempt probe timeout, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_PROBE_TIMEOUT_MS)]
    pub probe_timeout_ms: u64,

    /// Lower clamp bound for manually-overridden weights.
    #[arg(long, default_value_t = MIN_WEIGHT, env = "MIN_WEIGHT")]
    pub min_weight: f64,

    /// Upper clamp bound for manually-overridden weights.
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
    /// Parse the configured `--backend name=url` pairs.
    ///
    /// Returns an error string (mapped to `ConfigFatal` by the caller) if
    /// any entry is malformed.
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
