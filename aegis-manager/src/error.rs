//! Manager-local error wrapping.

use thiserror::Error;

/// Errors that can abort manager startup.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// A core domain error (bad sample, bad payload, etc.).
    #[error(transparent)]
    Core(#[from] aegis_core::AegisError),

    /// Configuration was invalid at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP server failed to bind or accept.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}
