//! Accept loop and route dispatch for the router's data-plane surface
//! (spec §6 "Router HTTP surface").

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::RouterError;
use crate::forward::forward_once;
use crate::metrics;
use crate::state::AppState;

type BoxBody = Full<Bytes>;

/// Starts the router's HTTP data-plane server on `addr`. Runs until the
/// listener itself fails.
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "router listening");
    serve(listener, state).await
}

/// Serves the router's HTTP surface on an already-bound listener. Split
/// out from [`start_server`] so tests can bind to an ephemeral port.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let state = Arc::clone(&state);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { Ok::<_, hyper::Error>(route(req, state).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!(error = %err, "connection error");
            }
        });
    }
}

async fn route(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (method, path.as_str()) {
        (Method::GET, "/predict") => handle_predict(&state).await,
        (Method::GET, "/metrics") => get_metrics(),
        (Method::GET, "/healthz") => get_healthz(),
        _ => not_found(),
    }
}

/// `GET /predict` — spec §6. 200 on forward success, 503 when no backend
/// is selectable, 500 on forward error.
async fn handle_predict(state: &Arc<AppState>) -> Response<BoxBody> {
    let permit = match Arc::clone(&state.inflight).try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => return error_response(StatusCode::SERVICE_UNAVAILABLE, RouterError::Busy),
    };

    let start = Instant::now();
    let mut rng = StdRng::from_entropy();
    let result = forward_once(state, &mut rng).await;
    drop(permit);

    metrics::REQUEST_LATENCY_MS.observe(start.elapsed().as_secs_f64() * 1000.0);

    match result {
        Ok(outcome) => json_response(StatusCode::OK, outcome.body),
        Err(RouterError::NoCandidate) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, RouterError::NoCandidate)
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

fn error_response(status: StatusCode, err: RouterError) -> Response<BoxBody> {
    json_response(status, json!({"error": err.to_string()}))
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<BoxBody> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn get_metrics() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/plain; version=0.0.4")
        .body(Full::new(Bytes::from(metrics::render())))
        .unwrap()
}

fn get_healthz() -> Response<BoxBody> {
    json_response(StatusCode::OK, json!({"status": "ok"}))
}

fn not_found() -> Response<BoxBody> {
    json_response(StatusCode::NOT_FOUND, json!({"error": "not found"}))
}
