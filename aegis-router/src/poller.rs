//! Background weight poller (spec §4.3 "Poll-in-background", strategy 2 —
//! the strategy a conforming implementation MUST implement).
//!
//! Generalizes the same `tokio::time::interval` background-task shape the
//! manager's prober uses, but refreshes a cached `WeightsSnapshot` instead
//! of backend health.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use aegis_core::WeightsSnapshot;
use tokio::time;
use tracing::{debug, warn};

use crate::state::AppState;

/// Spawns a background task that polls `GET {manager_url}/weights` every
/// `interval_ms` and stores the parsed result in `state.weights`.
///
/// On fetch or parse failure the previous snapshot is left untouched —
/// spec §5's "fall back to cached/last-known weights" rule — so a
/// transient manager outage never clears a perfectly good cache.
pub fn spawn_poll_loop(
    state: Arc<AppState>,
    interval_ms: u64,
    timeout_ms: u64,
) -> tokio::task::JoinHandle<()> {
    let interval = Duration::from_millis(interval_ms);
    let timeout = Duration::from_millis(timeout_ms);

    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            poll_once(&state, timeout).await;
        }
    })
}

async fn poll_once(state: &Arc<AppState>, timeout: Duration) {
    let url = format!("{}/weights", state.manager_url);

    let outcome = time::timeout(timeout, state.client.get(&url).send()).await;
    let body = match outcome {
        Ok(Ok(resp)) if resp.status().is_success() => match resp.json::<serde_json::Value>().await
        {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "weights response was not valid JSON, keeping cached snapshot");
                return;
            }
        },
        Ok(Ok(resp)) => {
            warn!(status = %resp.status(), "weights fetch returned non-success, keeping cached snapshot");
            return;
        }
        Ok(Err(e)) => {
            warn!(error = %e, "weights fetch failed, keeping cached snapshot");
            return;
        }
        Err(_) => {
            warn!("weights fetch timed out, keeping cached snapshot");
            return;
        }
    };

    match WeightsSnapshot::from_json(&body) {
        Ok(snapshot) => {
            state.weights.store(Arc::new(Some(snapshot)));
            state.ever_polled.store(true, Ordering::Release);
            debug!("weights snapshot refreshed");
        }
        Err(e) => {
            warn!(error = %e, "failed to parse weights response, keeping cached snapshot");
        }
    }
}
