//! Aegis core: domain models, EWMA weighting, and selection algorithms.
//!
//! This crate holds the shared, dependency-light logic used by every
//! Aegis binary (`aegis-manager`, `aegis-router`, `aegis-autoscaler`):
//! the backend registry and state store (spec §4.1), derived-weight
//! computation and wire shapes (spec §3, §6), and the weighted-random
//! selection algorithm (spec §4.3).

/// Tunable constants shared by every Aegis binary.
pub mod config;
/// Domain models: backend identity, mutable telemetry, and the registry.
pub mod domain;
/// Shared error taxonomy.
pub mod error;
/// EWMA tracking, derived-weight computation, and backend selection.
pub mod load_balancer;

pub use domain::backend::Backend;
pub use domain::registry::{BackendRegistry, BackendSnapshot, ManualOverrideMap};
pub use domain::state::BackendState;
pub use error::{AegisError, Result};
pub use load_balancer::selector::{select, Candidate};
pub use load_balancer::weight::{derived_weight, DerivedEntry, WeightsSnapshot};
