//! Shared error taxonomy for the Aegis workspace.

use thiserror::Error;

/// Errors surfaced by core domain operations.
///
/// Binary crates (`aegis-manager`, `aegis-router`, `aegis-autoscaler`) map
/// these onto HTTP status codes and `tracing` log levels per their own
/// error modules; this enum only carries the taxonomy from the spec's
/// error handling design (bad payload, bad sample, no candidate, config
/// fatal).
#[derive(Debug, Error)]
pub enum AegisError {
    /// A sample latency was negative, non-finite, or otherwise unusable.
    #[error("bad sample for backend '{backend}': {reason}")]
    BadSample {
        /// The backend the sample was reported for.
        backend: String,
        /// Why the sample was rejected.
        reason: String,
    },

    /// An inbound JSON payload was missing a required field or malformed.
    #[error("bad payload: {0}")]
    BadPayload(String),

    /// Backend selection found no candidate at all (empty backend set).
    #[error("no backend available for selection")]
    NoCandidate,

    /// Required configuration was missing or invalid at startup.
    #[error("configuration error: {0}")]
    ConfigFatal(String),

    /// Failed to (de)serialize JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias used throughout `aegis-core`.
pub type Result<T> = std::result::Result<T, AegisError>;
