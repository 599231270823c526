//! Request forwarding (spec §4.3 "Forwarding").
//!
//! Issues the forwarded request via the shared `reqwest::Client`
//! (promoted from the teacher's `dev-dependency` on `reqwest` to a normal
//! one — see DESIGN.md), retries once against a different backend on
//! failure, and fires-and-forgets a `/record` callback to the manager
//! carrying the real backend HTTP status code (spec.md §6's
//! `{backend, latency_s, status_code?}` body, reported verbatim rather
//! than reduced to a boolean) whose own failures are logged at `debug`
//! and otherwise dropped (spec §7: "Record failures are silently
//! dropped").

use std::time::{Duration, Instant};

use rand::Rng;
use serde_json::json;
use tracing::debug;

use crate::error::RouterError;
use crate::metrics;
use crate::selection::{choose_backend, choose_backend_excluding};
use crate::state::AppState;

/// The outcome of a successful forward: the backend's raw JSON body and
/// which backend served it.
pub struct ForwardOutcome {
    /// Name of the backend that served the request.
    pub backend: String,
    /// The backend's response body, forwarded verbatim.
    pub body: serde_json::Value,
}

/// Select a backend and forward the request, retrying once against a
/// different backend on failure (spec §4.3).
///
/// A retried request counts as one logical request for metrics purposes
/// but two physical forwards (spec §4.3) — `metrics::BACKEND_CHOSEN_TOTAL`
/// is bumped once per physical attempt, `metrics::REQUESTS_TOTAL` once per
/// call to this function.
pub async fn forward_once<R: Rng + ?Sized>(
    state: &AppState,
    rng: &mut R,
) -> Result<ForwardOutcome, RouterError> {
    metrics::REQUESTS_TOTAL.inc();

    let first = choose_backend(state, rng)?;
    let first_err = match try_forward(state, &first).await {
        Ok(outcome) => {
            spawn_record(state, &first, outcome.latency_s, outcome.status_code);
            return Ok(ForwardOutcome {
                backend: first,
                body: outcome.body,
            });
        }
        Err(e) => e,
    };
    metrics::FORWARD_FAILURES_TOTAL.inc();

    let second = match choose_backend_excluding(state, rng, Some(&first)) {
        Ok(name) => name,
        Err(_) => {
            debug!(backend = %first, error = %first_err, "forward failed, no other backend to retry against");
            return Err(RouterError::ForwardFailed(first_err));
        }
    };
    debug!(backend = %first, error = %first_err, retry = %second, "forward failed, retrying against a different backend");

    match try_forward(state, &second).await {
        Ok(outcome) => {
            spawn_record(state, &second, outcome.latency_s, outcome.status_code);
            Ok(ForwardOutcome {
                backend: second,
                body: outcome.body,
            })
        }
        Err(e) => {
            metrics::FORWARD_FAILURES_TOTAL.inc();
            Err(RouterError::ForwardFailed(e))
        }
    }
}

/// The outcome of one successful physical forward attempt.
struct TryForwardOutcome {
    body: serde_json::Value,
    latency_s: f64,
    status_code: u16,
}

async fn try_forward(state: &AppState, backend: &str) -> Result<TryForwardOutcome, String> {
    let url = endpoint_for(state, backend).ok_or_else(|| format!("unknown backend '{backend}'"))?;
    let timeout = Duration::from_millis(state.forward_timeout_ms);

    let start = Instant::now();
    let outcome = tokio::time::timeout(timeout, state.client.get(&url).send()).await;

    match outcome {
        Ok(Ok(resp)) if resp.status().is_success() => {
            let status_code = resp.status().as_u16();
            let latency_s = start.elapsed().as_secs_f64();
            let body = resp
                .json::<serde_json::Value>()
                .await
                .map_err(|e| format!("invalid response body: {e}"))?;
            metrics::BACKEND_CHOSEN_TOTAL.with_label_values(&[backend]).inc();
            Ok(TryForwardOutcome {
                body,
                latency_s,
                status_code,
            })
        }
        Ok(Ok(resp)) => Err(format!("backend responded with {}", resp.status())),
        Ok(Err(e)) => Err(format!("request error: {e}")),
        Err(_) => Err("forward timed out".to_string()),
    }
}

fn endpoint_for(state: &AppState, backend: &str) -> Option<String> {
    // The router only knows endpoints for its statically configured
    // backends; a name the manager knows about via `/record` but that
    // was never in `BACKEND_LIST` has nowhere to forward to.
    state
        .configured_backends
        .iter()
        .find(|b| b.name == backend)
        .map(|b| b.url.clone())
}

fn spawn_record(state: &AppState, backend: &str, latency_s: f64, status_code: u16) {
    let client = state.client.clone();
    let manager_url = state.manager_url.clone();
    let timeout = Duration::from_millis(state.record_timeout_ms);
    let backend = backend.to_string();

    tokio::spawn(async move {
        let url = format!("{manager_url}/record");
        let payload = json!({"backend": backend, "latency_s": latency_s, "status_code": status_code});
        let post = client.post(&url).json(&payload).send();

        match tokio::time::timeout(timeout, post).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!(backend = %backend, error = %e, "record callback failed, dropping"),
            Err(_) => debug!(backend = %backend, "record callback timed out, dropping"),
        }
    });
}
