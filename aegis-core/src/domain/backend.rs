//! Backend identity.
//!
//! A backend's identity — its name and endpoint — is fixed once it is
//! either configured at startup or first observed via a `/record` post
//! for a previously-unknown name (spec scenario S4). Its *state* (EWMA
//! latency, health, sample count) is a separate, mutable concern; see
//! [`crate::domain::state::BackendState`].

/// The stable name a backend is known by (e.g. `"backend1"`).
pub type BackendName = String;

/// A single upstream backend's identity.
#[derive(Debug, Clone)]
pub struct Backend {
    /// The backend's stable name.
    pub name: BackendName,
    /// The backend's inference endpoint, when known.
    ///
    /// `None` for backends created implicitly by an unexpected
    /// `/record` post — they have state but no probeable address.
    pub endpoint: Option<String>,
}

impl Backend {
    /// Create a backend with a known endpoint (the configured, startup path).
    pub fn new(name: impl Into<BackendName>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: Some(endpoint.into()),
        }
    }

    /// Create a backend with no known endpoint (the implicit, record-only path).
    pub fn without_endpoint(name: impl Into<BackendName>) -> Self {
        Self {
            name: name.into(),
            endpoint: None,
        }
    }
}
