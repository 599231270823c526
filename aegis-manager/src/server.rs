//! Accept loop and route dispatch, generalized from a single-route hyper
//! server into the manager's five-endpoint control-plane surface (spec §6).

use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::handlers;
use crate::state::AppState;

/// Starts the manager's HTTP control-plane server on `addr`. Runs until
/// the listener itself fails.
pub async fn start_server(
    addr: SocketAddr,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "manager listening");
    serve(listener, state).await
}

/// Serves the manager's HTTP surface on an already-bound listener. Split
/// out from [`start_server`] so tests can bind to an ephemeral port and
/// discover the real address before connecting.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, hyper::Error>(route(req, state).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!(error = %err, "connection error");
            }
        });
    }
}

async fn route(req: Request<Incoming>, state: AppState) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (method, path.as_str()) {
        (Method::GET, "/weights") => handlers::get_weights(&state),
        (Method::POST, "/weights") => handlers::post_weights(req, &state).await,
        (Method::DELETE, "/weights") => handlers::delete_weights(&state),
        (Method::POST, "/record") => handlers::post_record(req, &state).await,
        (Method::GET, "/metrics") => handlers::get_metrics(),
        (Method::GET, "/healthz") => handlers::get_healthz(),
        _ => handlers::not_found(),
    }
}
