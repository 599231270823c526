//! Shared application state handed to every request handler.

use std::sync::Arc;

use aegis_core::{BackendRegistry, ManualOverrideMap};

/// State shared across the manager's handlers. Cheap to clone (an `Arc`
/// bundle); never held across an `.await` beyond the registry/override
/// calls themselves, which are synchronous.
#[derive(Clone)]
pub struct AppState {
    /// The backend registry and state store.
    pub registry: Arc<BackendRegistry>,
    /// The manual override map.
    pub overrides: Arc<ManualOverrideMap>,
    /// Lower clamp bound for manually-overridden weights.
    pub min_weight: f64,
    /// Upper clamp bound for manually-overridden weights.
    pub max_weight: f64,
}
