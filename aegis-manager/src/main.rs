//! Aegis Manager
//!
//! The control-plane binary: runs the probe loop, ingests router-reported
//! samples, computes derived weights, arbitrates manual overrides, and
//! serves the weight/metrics/health HTTP surface (spec §4.2, §6).

#![deny(missing_docs)]

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use aegis_core::{BackendRegistry, ManualOverrideMap};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use aegis_manager::config::Args;
use aegis_manager::error::ManagerError;
use aegis_manager::state::AppState;
use aegis_manager::{metrics, prober, server};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "manager exited with a fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ManagerError> {
    let args = Args::parse();
    let backends = args
        .parsed_backends()
        .map_err(ManagerError::Config)?;

    tracing::info!(
        bind = %args.bind,
        backends = backends.len(),
        ewma_alpha = args.ewma_alpha,
        "starting aegis-manager"
    );

    metrics::init();

    let registry = Arc::new(BackendRegistry::new(
        backends.into_iter().map(|b| (b.name, b.url)),
        args.ewma_alpha,
    ));
    let overrides = Arc::new(ManualOverrideMap::new());

    let probe_client = reqwest::Client::builder()
        .timeout(Duration::from_millis(args.probe_timeout_ms))
        .build()
        .map_err(|e| ManagerError::Config(e.to_string()))?;

    prober::spawn_probe_loop(
        Arc::clone(&registry),
        Arc::clone(&overrides),
        probe_client,
        args.probe_interval_ms,
        args.probe_timeout_ms,
    );

    let state = AppState {
        registry,
        overrides,
        min_weight: args.min_weight,
        max_weight: args.max_weight,
    };

    server::start_server(args.bind, state)
        .await
        .map_err(|e| ManagerError::Config(e.to_string()))
}
