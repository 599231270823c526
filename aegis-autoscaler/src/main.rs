//! Aegis Autoscaler
//!
//! Reference external process (spec §4.4 "listed for interface
//! completeness"): polls the manager's `/weights`, computes a normalized
//! override, smooths and clamps it, and posts it back. A direct Rust
//! port of `original_source/bench/autoscaler.py`.

#![deny(missing_docs)]

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use aegis_autoscaler::config::Args;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs_f64(args.request_timeout_seconds.max(1.0)))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    aegis_autoscaler::run_forever(client, args).await
}
