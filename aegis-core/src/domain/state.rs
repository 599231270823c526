//! Per-backend mutable state: EWMA latency, health, and sample bookkeeping.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{DEFAULT_EWMA_ALPHA, DEFAULT_SEED_LATENCY_S, UNHEALTHY_DECAY_PENALTY};
use crate::load_balancer::ewma::Ewma;

/// The mutable telemetry state carried per backend.
///
/// Every mutation (probe sweep or inbound `/record`) goes through
/// [`BackendState::add_sample`] or [`BackendState::mark_unhealthy`], both of
/// which are lock-free and safe to call concurrently for different
/// backends; concurrent calls for the *same* backend serialize through the
/// underlying [`Ewma`]'s CAS loop.
#[derive(Debug)]
pub struct BackendState {
    ewma: Ewma,
    healthy: AtomicBool,
    sample_count: AtomicU64,
    /// Milliseconds since the Unix epoch of the last sample; `0` means
    /// "never sampled".
    last_sample_millis: AtomicU64,
    /// Smoothing constant, fixed per backend at construction.
    alpha: f64,
}

impl Default for BackendState {
    fn default() -> Self {
        Self::new(DEFAULT_EWMA_ALPHA)
    }
}

impl BackendState {
    /// Create state for a backend with no samples yet, healthy by default
    /// (state machine's `Unknown` is modeled here as `healthy = true,
    /// ewma = None`, matching the Python source's assume-healthy startup).
    pub fn new(alpha: f64) -> Self {
        Self {
            ewma: Ewma::new(),
            healthy: AtomicBool::new(true),
            sample_count: AtomicU64::new(0),
            last_sample_millis: AtomicU64::new(0),
            alpha,
        }
    }

    /// Current EWMA latency in seconds, or `None` before the first sample.
    pub fn ewma_latency_s(&self) -> Option<f64> {
        self.ewma.get()
    }

    /// Whether the backend is currently considered healthy.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Total number of samples applied so far.
    pub fn sample_count(&self) -> u64 {
        self.sample_count.load(Ordering::Relaxed)
    }

    /// Unix millis of the most recent sample, or `None` if never sampled.
    pub fn last_sample_millis(&self) -> Option<u64> {
        match self.last_sample_millis.load(Ordering::Relaxed) {
            0 => None,
            v => Some(v),
        }
    }

    /// Apply a new latency sample: updates EWMA, marks healthy, bumps the
    /// sample count, and stamps the sample time.
    ///
    /// Shared by the probe loop and `/record` ingestion (spec invariant:
    /// "both paths share the same update rule").
    pub fn add_sample(&self, latency_s: f64) {
        self.ewma.observe(latency_s, self.alpha);
        self.sample_count.fetch_add(1, Ordering::Relaxed);
        self.healthy.store(true, Ordering::Release);
        self.stamp_now();
    }

    /// Apply a sample from an inbound `/record` post.
    ///
    /// `success` reflects whether the forwarded request the record
    /// describes succeeded (no `status_code >= 500`). On success this
    /// transitions `Unhealthy -> Healthy` (spec §4.2 state machine: "any
    /// successful probe *or record*"). A failing record never flips
    /// health to unhealthy by itself — only the probe loop may do that —
    /// it still contributes its latency to the EWMA either way.
    pub fn add_record_sample(&self, latency_s: f64, success: bool) {
        self.ewma.observe(latency_s, self.alpha);
        self.sample_count.fetch_add(1, Ordering::Relaxed);
        if success {
            self.mark_healthy();
        }
        self.stamp_now();
    }

    /// Mark the backend unhealthy and decay its EWMA by the configured
    /// penalty (or seed it at the default if it has never sampled).
    pub fn mark_unhealthy(&self) {
        self.healthy.store(false, Ordering::Release);
        self.ewma
            .decay(UNHEALTHY_DECAY_PENALTY, DEFAULT_SEED_LATENCY_S);
    }

    /// Mark the backend healthy without touching its EWMA (a bare
    /// successful probe with latency applied separately via `add_sample`).
    pub fn mark_healthy(&self) {
        self.healthy.store(true, Ordering::Release);
    }

    fn stamp_now(&self) {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        // Never store the sentinel "never sampled" value for a real sample.
        self.last_sample_millis.store(millis.max(1), Ordering::Relaxed);
    }
}
