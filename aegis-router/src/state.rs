//! Shared application state handed to every request handler.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use aegis_core::WeightsSnapshot;
use arc_swap::ArcSwap;
use tokio::sync::Semaphore;

use crate::config::BackendSpec;

/// The router's cached view of manager-published weights, plus whatever
/// the request path and background poller need to share.
pub struct AppState {
    /// HTTP client used for weight polling, forwarding, and the
    /// fire-and-forget record callback. Pooled and shared (spec §5).
    pub client: reqwest::Client,
    /// Base URL of the manager's control plane.
    pub manager_url: String,
    /// Most recently polled weights snapshot. `None` until the first
    /// successful poll; after that, stale data is retained on poll
    /// failure rather than cleared (spec §4.3, §5).
    pub weights: ArcSwap<Option<WeightsSnapshot>>,
    /// Whether the poller has ever completed a successful fetch. Gates
    /// the router-specific "never polled -> uniform fallback" rule,
    /// which is distinct from "polled once, then started failing"
    /// (which keeps serving the last good snapshot instead).
    pub ever_polled: AtomicBool,
    /// The statically configured backend list, used only as the
    /// candidate set for uniform fallback.
    pub configured_backends: Vec<BackendSpec>,
    /// Bounds concurrently in-flight forwards (spec §5 backpressure).
    pub inflight: Arc<Semaphore>,
    /// Per-attempt forward timeout.
    pub forward_timeout_ms: u64,
    /// Per-attempt fire-and-forget record timeout.
    pub record_timeout_ms: u64,
}

impl AppState {
    /// Construct fresh state with no weights polled yet.
    pub fn new(
        client: reqwest::Client,
        manager_url: String,
        configured_backends: Vec<BackendSpec>,
        max_inflight: usize,
        forward_timeout_ms: u64,
        record_timeout_ms: u64,
    ) -> Self {
        Self {
            client,
            manager_url,
            weights: ArcSwap::from_pointee(None),
            ever_polled: AtomicBool::new(false),
            configured_backends,
            inflight: Arc::new(Semaphore::new(max_inflight)),
            forward_timeout_ms,
            record_timeout_ms,
        }
    }
}
