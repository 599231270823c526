//! Exercises one full autoscaler round (fetch -> target -> smooth ->
//! clamp -> apply) against a fake manager over a loopback listener.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use aegis_autoscaler::config::Args;
use aegis_autoscaler::smooth::SmoothStore;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// A fake manager that always serves the derived `/weights` shape on GET
/// and records the last POSTed body for inspection.
async fn spawn_fake_manager() -> (String, Arc<Mutex<Option<Value>>>) {
    let last_post: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&last_post);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(s) => s,
                Err(_) => return,
            };
            let io = TokioIo::new(stream);
            let captured = Arc::clone(&captured);

            tokio::spawn(async move {
                let captured = Arc::clone(&captured);
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let captured = Arc::clone(&captured);
                    async move {
                        if req.method() == Method::POST {
                            let body = req.into_body().collect().await.unwrap().to_bytes();
                            let v: Value = serde_json::from_slice(&body).unwrap();
                            *captured.lock().unwrap() = Some(v);
                            let resp = json!({"status": "ok", "applied": {}});
                            return Ok::<_, Infallible>(Response::new(Full::new(Bytes::from(
                                resp.to_string(),
                            ))));
                        }

                        let resp = json!({
                            "b1": {"ewma_ms": 50.0, "healthy": 1},
                            "b2": {"ewma_ms": 200.0, "healthy": 1},
                        });
                        Ok::<_, Infallible>(Response::new(Full::new(Bytes::from(resp.to_string()))))
                    }
                });
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    });

    (format!("http://{addr}"), last_post)
}

#[tokio::test]
async fn one_round_fetches_smooths_and_posts_a_weighted_override() {
    let (manager_url, last_post) = spawn_fake_manager().await;
    let client = reqwest::Client::new();

    let args = Args {
        manager_url,
        poll_seconds: 1.0,
        smooth_alpha: 1.0, // no smoothing lag, so this round's output is deterministic
        min_weight: 0.05,
        max_weight: 100.0,
        request_timeout_seconds: 3.0,
    };
    let mut smooth = SmoothStore::new(args.smooth_alpha);

    let applied = aegis_autoscaler::run_once(&client, &args, &mut smooth)
        .await
        .unwrap();

    // b1 (50ms) should get a larger share than b2 (200ms).
    assert!(applied["b1"] > applied["b2"]);
    let total: f64 = applied.values().sum();
    assert!((total - 100.0).abs() < 1e-6);

    let posted = last_post.lock().unwrap().clone().unwrap();
    assert_eq!(posted["b1"], applied["b1"]);
}
