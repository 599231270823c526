//! End-to-end tests against the manager's real HTTP surface, driven over a
//! loopback `TcpListener` with a `reqwest` client (S1-S5, P2).

use std::sync::Arc;

use aegis_core::{BackendRegistry, ManualOverrideMap};
use aegis_manager::state::AppState;
use aegis_manager::{metrics, server};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Spawns a manager instance on an ephemeral loopback port and returns its
/// base URL and a handle to the underlying registry/overrides for direct
/// inspection.
async fn spawn_manager(backends: &[&str]) -> (String, Arc<BackendRegistry>, Arc<ManualOverrideMap>) {
    metrics::init();

    let registry = Arc::new(BackendRegistry::new(
        backends
            .iter()
            .map(|n| (n.to_string(), format!("http://example.invalid/{n}/predict"))),
        0.2,
    ));
    let overrides = Arc::new(ManualOverrideMap::new());

    let state = AppState {
        registry: Arc::clone(&registry),
        overrides: Arc::clone(&overrides),
        min_weight: 0.05,
        max_weight: 100.0,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server::serve(listener, state).await;
    });

    (format!("http://{addr}"), registry, overrides)
}

#[tokio::test]
async fn get_weights_defaults_to_derived_shape_when_no_overrides() {
    let (base, _registry, _overrides) = spawn_manager(&["b1", "b2"]).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/weights")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    let obj = body.as_object().unwrap();
    assert_eq!(obj.len(), 2);
    // A backend with no samples yet reports ewma_ms: null, healthy: true.
    for (_, entry) in obj {
        assert_eq!(entry["ewma_ms"], Value::Null);
        assert_eq!(entry["healthy"], 1);
    }
}

#[tokio::test]
async fn record_then_weights_reflects_ewma() {
    let (base, _registry, _overrides) = spawn_manager(&["b1"]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/record"))
        .json(&json!({"backend": "b1", "latency_s": 0.05}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = client
        .get(format!("{base}/weights"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let entry = &body["b1"];
    assert!((entry["ewma_ms"].as_f64().unwrap() - 50.0).abs() < 1e-6);
    assert_eq!(entry["healthy"], 1);
}

#[tokio::test]
async fn record_with_missing_backend_is_rejected() {
    let (base, _registry, _overrides) = spawn_manager(&["b1"]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/record"))
        .json(&json!({"latency_s": 0.05}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

/// A `/record` for a name outside the configured list is accepted and
/// silently registers a new backend (spec §4.1: the registry is keyed
/// purely by name, with no fixed membership).
#[tokio::test]
async fn record_for_unknown_backend_registers_it() {
    let (base, registry, _overrides) = spawn_manager(&["b1"]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/record"))
        .json(&json!({"backend": "ghost", "latency_s": 0.05}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(registry.snapshot().contains_key("ghost"));
}

/// A `/record` with a negative latency is rejected regardless of whether
/// the backend is already known.
#[tokio::test]
async fn record_with_negative_latency_is_rejected() {
    let (base, _registry, _overrides) = spawn_manager(&["b1"]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/record"))
        .json(&json!({"backend": "b1", "latency_s": -1.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

/// P2: once a manual override is set, `/weights` must serve the flat
/// override shape, not the derived shape, regardless of recorded samples.
#[tokio::test]
async fn post_weights_overrides_dominate_derived_state() {
    let (base, _registry, _overrides) = spawn_manager(&["b1", "b2"]).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/record"))
        .json(&json!({"backend": "b1", "latency_s": 0.01}))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/weights"))
        .json(&json!({"b1": 2.0, "b2": 5.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = client
        .get(format!("{base}/weights"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["b1"], 2.0);
    assert_eq!(body["b2"], 5.0);
}

/// Overrides are clamped to [min_weight, max_weight] on write.
#[tokio::test]
async fn post_weights_clamps_out_of_range_values() {
    let (base, _registry, _overrides) = spawn_manager(&["b1"]).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/weights"))
        .json(&json!({"b1": 1000.0}))
        .send()
        .await
        .unwrap();
    let applied: Value = resp.json().await.unwrap();
    assert_eq!(applied["applied"]["b1"], 100.0);
}

/// DELETE /weights (and an empty POST body) clear overrides and fall back
/// to the derived shape again.
#[tokio::test]
async fn delete_weights_reverts_to_derived_shape() {
    let (base, _registry, _overrides) = spawn_manager(&["b1"]).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/weights"))
        .json(&json!({"b1": 3.0}))
        .send()
        .await
        .unwrap();

    let resp = client.delete(format!("{base}/weights")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = client
        .get(format!("{base}/weights"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(body["b1"].is_object());
}

#[tokio::test]
async fn healthz_and_metrics_are_reachable() {
    let (base, _registry, _overrides) = spawn_manager(&["b1"]).await;
    let client = reqwest::Client::new();

    let health = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(health.status(), 200);

    let metrics_resp = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert_eq!(metrics_resp.status(), 200);
    let text = metrics_resp.text().await.unwrap();
    assert!(text.contains("aegis_manager") || text.contains("backend"));
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let (base, _registry, _overrides) = spawn_manager(&["b1"]).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/bogus")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}
