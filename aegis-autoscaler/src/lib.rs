//! Library surface for the `aegis-autoscaler` binary: a direct port of
//! `original_source/bench/autoscaler.py`'s poll/smooth/clamp/POST loop.

#![deny(missing_docs)]

/// CLI/env configuration.
pub mod config;
/// Autoscaler-local error wrapping.
pub mod error;
/// EMA smoothing over successive target weight maps.
pub mod smooth;
/// Observed-weights-to-normalized-target conversion.
pub mod target;

use std::collections::HashMap;
use std::time::Duration;

use aegis_core::WeightsSnapshot;
use tracing::{info, warn};

use crate::config::Args;
use crate::error::AutoscalerError;
use crate::smooth::SmoothStore;

/// Fetch, re-derive, smooth, clamp, and POST back one round of overrides.
/// Returns the applied map on success.
pub async fn run_once(
    client: &reqwest::Client,
    args: &Args,
    smooth: &mut SmoothStore,
) -> Result<HashMap<String, f64>, AutoscalerError> {
    let observed = fetch_observed(client, args).await?;
    let target = target::compute_target(&observed);
    let smoothed = smooth.update(&target);

    let clamped: HashMap<String, f64> = smoothed
        .into_iter()
        .map(|(k, v)| (k, v.clamp(args.min_weight, args.max_weight)))
        .collect();

    apply(client, args, &clamped).await?;
    Ok(clamped)
}

async fn fetch_observed(
    client: &reqwest::Client,
    args: &Args,
) -> Result<HashMap<String, f64>, AutoscalerError> {
    let url = format!("{}/weights", args.manager_url);
    let timeout = Duration::from_secs_f64(args.request_timeout_seconds);

    let resp = tokio::time::timeout(timeout, client.get(&url).send())
        .await
        .map_err(|_| AutoscalerError::Fetch("timed out".to_string()))?
        .map_err(|e| AutoscalerError::Fetch(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(AutoscalerError::Fetch(format!("status {}", resp.status())));
    }

    let body: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| AutoscalerError::Fetch(e.to_string()))?;

    let snapshot = WeightsSnapshot::from_json(&body)?;
    Ok(target::observed_map(&snapshot))
}

async fn apply(
    client: &reqwest::Client,
    args: &Args,
    weights: &HashMap<String, f64>,
) -> Result<(), AutoscalerError> {
    let url = format!("{}/weights", args.manager_url);
    let timeout = Duration::from_secs_f64(args.request_timeout_seconds);

    let resp = tokio::time::timeout(timeout, client.post(&url).json(weights).send())
        .await
        .map_err(|_| AutoscalerError::Apply("timed out".to_string()))?
        .map_err(|e| AutoscalerError::Apply(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(AutoscalerError::Apply(format!("status {}", resp.status())));
    }

    Ok(())
}

/// Runs the autoscaler's poll loop forever, logging and continuing past
/// any single round's failure (spec §4.4).
pub async fn run_forever(client: reqwest::Client, args: Args) -> ! {
    info!(
        manager_url = %args.manager_url,
        poll_seconds = args.poll_seconds,
        "autoscaler started"
    );

    let mut smooth = SmoothStore::new(args.smooth_alpha);
    let period = Duration::from_secs_f64(args.poll_seconds.max(0.01));

    loop {
        match run_once(&client, &args, &mut smooth).await {
            Ok(applied) => info!(count = applied.len(), "applied smoothed overrides"),
            Err(e) => warn!(error = %e, "autoscaler round failed, will retry next poll"),
        }
        tokio::time::sleep(period).await;
    }
}
