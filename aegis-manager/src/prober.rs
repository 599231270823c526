//! Background probe loop (spec §4.2 "Probe loop").
//!
//! Generalized from a raw TCP-connect health checker into an HTTP GET
//! probe against each backend's inference endpoint, measuring wall-clock
//! latency and feeding it through the same `add_sample`/`mark_unhealthy`
//! update rule the `/record` handler uses. Keeps the teacher's
//! `tokio::time::interval` sweep shape; replaces the probe body.

use std::sync::Arc;
use std::time::{Duration, Instant};

use aegis_core::{BackendRegistry, ManualOverrideMap};
use tokio::time;
use tracing::{info, warn};

use crate::metrics;

/// Spawns a background Tokio task that periodically probes every backend
/// with a known endpoint and updates its EWMA/health state.
///
/// A sweep is allowed up to `3 * interval` before being abandoned (spec
/// §5 cancellation rule); any probe still in flight past that deadline is
/// dropped rather than awaited, so a single wedged backend never stalls
/// the whole sweep cadence.
pub fn spawn_probe_loop(
    registry: Arc<BackendRegistry>,
    overrides: Arc<ManualOverrideMap>,
    client: reqwest::Client,
    interval_ms: u64,
    probe_timeout_ms: u64,
) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_millis(interval_ms);
    let probe_timeout = Duration::from_millis(probe_timeout_ms);
    let sweep_budget = interval * 3;

    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.tick().await; // don't fire immediately on spawn

        loop {
            ticker.tick().await;

            let sweep = run_sweep(&registry, &client, probe_timeout);
            if time::timeout(sweep_budget, sweep).await.is_err() {
                warn!("probe sweep exceeded its budget and was abandoned");
            }

            metrics::publish(&registry, &overrides);
        }
    })
}

async fn run_sweep(registry: &Arc<BackendRegistry>, client: &reqwest::Client, timeout: Duration) {
    let targets = registry.probe_targets();
    let probes = targets.into_iter().map(|(name, endpoint)| {
        let registry = Arc::clone(registry);
        let client = client.clone();
        async move {
            let was_healthy = registry
                .snapshot()
                .get(&name)
                .map(|s| s.healthy)
                .unwrap_or(true);

            let start = Instant::now();
            let outcome = time::timeout(timeout, client.get(&endpoint).send()).await;

            match outcome {
                Ok(Ok(resp)) if resp.status().is_success() => {
                    let latency_s = start.elapsed().as_secs_f64();
                    // Infallible: the probe loop only ever observes
                    // finite, non-negative wall-clock durations.
                    let _ = registry.add_sample(&name, latency_s);
                    if !was_healthy {
                        info!(backend = %name, "probe recovered, backend marked healthy");
                    }
                }
                _ => {
                    registry.mark_unhealthy(&name);
                    if was_healthy {
                        warn!(backend = %name, "probe failed, backend marked unhealthy");
                    }
                }
            }
        }
    });

    futures_join_all(probes).await;
}

/// Minimal `join_all` so the probe fan-out doesn't pull in the `futures`
/// crate for a single call site.
async fn futures_join_all<I>(iter: I)
where
    I: IntoIterator,
    I::Item: std::future::Future<Output = ()>,
{
    let handles: Vec<_> = iter.into_iter().map(tokio::spawn).collect();
    for h in handles {
        let _ = h.await;
    }
}
