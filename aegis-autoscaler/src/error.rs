//! Autoscaler-local error wrapping.

use thiserror::Error;

/// Errors the autoscaler's poll loop can encounter. None of these abort
/// the process; the loop logs and continues (spec §4.4: "the manager
/// MUST NOT presume the autoscaler is present", and symmetrically the
/// autoscaler tolerates a manager that comes and goes).
#[derive(Debug, Error)]
pub enum AutoscalerError {
    /// Fetching `/weights` failed (network error or non-success status).
    #[error("fetch /weights failed: {0}")]
    Fetch(String),

    /// The `/weights` response body didn't parse as either wire shape.
    #[error("bad /weights response: {0}")]
    Core(#[from] aegis_core::AegisError),

    /// Posting the smoothed override back failed.
    #[error("post /weights failed: {0}")]
    Apply(String),
}
