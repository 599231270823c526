//! Aegis Router
//!
//! The data-plane binary: polls the manager's published weights in the
//! background, selects a backend per request via weighted random
//! selection with health filtering, forwards, and reports outcomes back
//! to the manager (spec §4.3, §6).

#![deny(missing_docs)]

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use aegis_router::config::Args;
use aegis_router::error::RouterError;
use aegis_router::state::AppState;
use aegis_router::{metrics, poller, server};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "router exited with a fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), RouterError> {
    let args = Args::parse();
    let backends = args.parsed_backends().map_err(RouterError::Config)?;

    tracing::info!(
        bind = %args.bind,
        manager_url = %args.manager_url,
        backends = backends.len(),
        max_inflight = args.max_inflight,
        "starting aegis-router"
    );

    metrics::init();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(args.forward_timeout_ms.max(args.weights_timeout_ms)))
        .build()
        .map_err(|e| RouterError::Config(e.to_string()))?;

    let state = Arc::new(AppState::new(
        client,
        args.manager_url.clone(),
        backends,
        args.max_inflight,
        args.forward_timeout_ms,
        args.record_timeout_ms,
    ));

    poller::spawn_poll_loop(Arc::clone(&state), args.poll_interval_ms, args.weights_timeout_ms);

    server::start_server(args.bind, state)
        .await
        .map_err(|e| RouterError::Config(e.to_string()))
}
