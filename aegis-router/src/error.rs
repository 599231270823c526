//! Router-local error wrapping (spec §7 error taxonomy).

use thiserror::Error;

/// Errors that can abort router startup, or that surface as structured
/// client-facing responses.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A core domain error (bad payload, no candidate, etc.).
    #[error(transparent)]
    Core(#[from] aegis_core::AegisError),

    /// Configuration was invalid at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP server failed to bind or accept.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    /// Selection found no candidate at all (empty backend set). Spec §7
    /// "No candidate": 503 to the client, no retry.
    #[error("no backend available for selection")]
    NoCandidate,

    /// Forwarding the request to the selected backend failed after the
    /// single permitted retry. Spec §7 "Transient upstream failure".
    #[error("forward to backend failed: {0}")]
    ForwardFailed(String),

    /// The in-flight request cap was already saturated (spec §5
    /// backpressure, §7 structured busy error).
    #[error("router is at capacity")]
    Busy,
}
