//! HTTP handlers for the manager's external surface (spec §6).

use std::collections::{BTreeMap, HashMap};

use aegis_core::load_balancer::weight::{DerivedEntry, WeightsSnapshot};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tracing::{debug, warn};

use crate::metrics;
use crate::state::AppState;

type BoxBody = Full<Bytes>;

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<BoxBody> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn bad_payload(detail: impl Into<String>) -> Response<BoxBody> {
    json_response(StatusCode::BAD_REQUEST, json!({"error": detail.into()}))
}

async fn read_json_body(
    req: Request<hyper::body::Incoming>,
) -> Result<serde_json::Value, Response<BoxBody>> {
    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| bad_payload(format!("failed to read body: {e}")))?
        .to_bytes();

    if body.is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }

    serde_json::from_slice(&body).map_err(|e| bad_payload(format!("invalid JSON body: {e}")))
}

/// `GET /weights` — spec §6.
pub fn get_weights(state: &AppState) -> Response<BoxBody> {
    let overrides = state.overrides.get();
    if !overrides.is_empty() {
        let body: BTreeMap<String, f64> = overrides.iter().map(|(k, v)| (k.clone(), *v)).collect();
        return json_response(StatusCode::OK, json!(WeightsSnapshot::Override(body)));
    }

    let snapshot = state.registry.snapshot();
    let mut derived = BTreeMap::new();
    for (name, s) in snapshot {
        derived.insert(
            name,
            DerivedEntry {
                ewma_ms: s.ewma_latency_s.map(|v| v * 1000.0),
                healthy: s.healthy,
            },
        );
    }
    json_response(StatusCode::OK, json!(WeightsSnapshot::Derived(derived)))
}

/// `POST /record` — spec §6, §4.2 "Record ingestion".
///
/// A record with a 5xx or missing status code must not mark the backend
/// unhealthy by itself (that's the probe loop's job), but it still
/// contributes to EWMA when a latency is present. Conversely, a record
/// that *doesn't* indicate failure recovers health same as a successful
/// probe (spec §4.2 state machine: "Unhealthy -> Healthy on any
/// successful probe or record").
pub async fn post_record(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
) -> Response<BoxBody> {
    let value = match read_json_body(req).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let backend = match value.get("backend").and_then(|v| v.as_str()) {
        Some(b) if !b.is_empty() => b.to_string(),
        _ => {
            metrics::RECORD_ERRORS_TOTAL.inc();
            return bad_payload("missing 'backend'");
        }
    };

    let latency_s = match value.get("latency_s").and_then(|v| v.as_f64()) {
        Some(l) => l,
        None => {
            metrics::RECORD_ERRORS_TOTAL.inc();
            return bad_payload("missing or non-numeric 'latency_s'");
        }
    };

    let status_code = value.get("status_code").and_then(|v| v.as_u64());
    let success = status_code.map(|sc| sc < 500).unwrap_or(true);

    if let Err(e) = state
        .registry
        .add_record_sample(&backend, latency_s, success)
    {
        metrics::RECORD_ERRORS_TOTAL.inc();
        warn!(backend = %backend, error = %e, "rejected bad /record sample");
        return bad_payload(e.to_string());
    }

    metrics::RECORD_TOTAL.inc();
    metrics::publish(&state.registry, &state.overrides);
    debug!(backend = %backend, latency_s, ?status_code, success, "record accepted");

    json_response(StatusCode::OK, json!({"status": "ok"}))
}

/// `POST /weights` — spec §6. An empty body is equivalent to `DELETE`.
pub async fn post_weights(
    req: Request<hyper::body::Incoming>,
    state: &AppState,
) -> Response<BoxBody> {
    let value = match read_json_body(req).await {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let obj = match value.as_object() {
        Some(o) => o,
        None => return bad_payload("body must be a JSON object of name -> weight"),
    };

    if obj.is_empty() {
        state.overrides.clear();
        metrics::publish(&state.registry, &state.overrides);
        return json_response(StatusCode::OK, json!({"status": "ok"}));
    }

    let mut values = HashMap::new();
    for (k, v) in obj {
        let w = v
            .as_f64()
            .or_else(|| v.get("weight").and_then(|w| w.as_f64()))
            .unwrap_or(1.0);
        values.insert(k.clone(), w);
    }

    let applied = state
        .overrides
        .set_with_bounds(values, state.min_weight, state.max_weight);
    metrics::publish(&state.registry, &state.overrides);

    json_response(
        StatusCode::OK,
        json!({"status": "ok", "applied": applied}),
    )
}

/// `DELETE /weights` — spec §6.
pub fn delete_weights(state: &AppState) -> Response<BoxBody> {
    state.overrides.clear();
    metrics::publish(&state.registry, &state.overrides);
    json_response(StatusCode::OK, json!({"status": "ok"}))
}

/// `GET /metrics` — Prometheus text exposition.
pub fn get_metrics() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; version=0.0.4")
        .body(Full::new(Bytes::from(metrics::render())))
        .unwrap()
}

/// `GET /healthz` — spec §6.
pub fn get_healthz() -> Response<BoxBody> {
    json_response(StatusCode::OK, json!({"status": "ok"}))
}

/// 404 for any unrecognized route.
pub fn not_found() -> Response<BoxBody> {
    json_response(StatusCode::NOT_FOUND, json!({"error": "not found"}))
}
