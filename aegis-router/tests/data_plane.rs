//! End-to-end tests against the router's real HTTP surface: a fake
//! backend plus the router server, both over loopback listeners.

use std::convert::Infallible;
use std::sync::Arc;

use aegis_router::config::BackendSpec;
use aegis_router::state::AppState;
use aegis_router::{metrics, server};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Spawns a trivial backend that always answers `GET /predict` with
/// `{"status": "ok", "from": name}`.
async fn spawn_fake_backend(name: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(s) => s,
                Err(_) => return,
            };
            let io = TokioIo::new(stream);
            tokio::spawn(async move {
                let service = service_fn(move |_req: Request<hyper::body::Incoming>| async move {
                    let body = json!({"status": "ok", "from": name}).to_string();
                    Ok::<_, Infallible>(Response::new(Full::new(Bytes::from(body))))
                });
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    });

    format!("http://{addr}/predict")
}

async fn spawn_router(backends: Vec<BackendSpec>, max_inflight: usize) -> String {
    metrics::init();

    let client = reqwest::Client::new();
    let state = Arc::new(AppState::new(
        client,
        "http://manager.invalid".to_string(),
        backends,
        max_inflight,
        5_000,
        1_000,
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server::serve(listener, state).await;
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn predict_forwards_to_a_configured_backend_when_manager_unreachable() {
    let backend_url = spawn_fake_backend("b1").await;
    let router = spawn_router(
        vec![BackendSpec {
            name: "b1".to_string(),
            url: backend_url,
        }],
        10,
    )
    .await;

    let client = reqwest::Client::new();
    let resp = client.get(format!("{router}/predict")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["from"], "b1");
}

#[tokio::test]
async fn predict_distributes_across_all_configured_backends_when_never_polled() {
    let b1 = spawn_fake_backend("b1").await;
    let b2 = spawn_fake_backend("b2").await;
    let router = spawn_router(
        vec![
            BackendSpec { name: "b1".to_string(), url: b1 },
            BackendSpec { name: "b2".to_string(), url: b2 },
        ],
        50,
    )
    .await;

    let client = reqwest::Client::new();
    let mut seen = std::collections::HashSet::new();
    for _ in 0..40 {
        let resp = client.get(format!("{router}/predict")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        seen.insert(body["from"].as_str().unwrap().to_string());
    }

    assert_eq!(seen.len(), 2, "expected both backends to be exercised over 40 draws");
}

#[tokio::test]
async fn predict_returns_503_when_no_backend_is_configured() {
    let router = spawn_router(vec![], 10).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{router}/predict")).send().await.unwrap();
    assert_eq!(resp.status(), 503);
}

#[tokio::test]
async fn healthz_and_metrics_are_reachable() {
    let backend_url = spawn_fake_backend("b1").await;
    let router = spawn_router(
        vec![BackendSpec {
            name: "b1".to_string(),
            url: backend_url,
        }],
        10,
    )
    .await;
    let client = reqwest::Client::new();

    let health = client.get(format!("{router}/healthz")).send().await.unwrap();
    assert_eq!(health.status(), 200);

    let metrics_resp = client.get(format!("{router}/metrics")).send().await.unwrap();
    assert_eq!(metrics_resp.status(), 200);
    let text = metrics_resp.text().await.unwrap();
    assert!(text.contains("aegis_router"));
}
