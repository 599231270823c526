//! Library surface for the `aegis-manager` binary.
//!
//! Split out from `main.rs` so integration tests can drive the real HTTP
//! surface over a loopback listener instead of re-implementing it.

#![deny(missing_docs)]

/// CLI/env configuration.
pub mod config;
/// Manager-local error wrapping.
pub mod error;
/// HTTP request handlers.
pub mod handlers;
/// Prometheus metrics exposition.
pub mod metrics;
/// Background backend probe loop.
pub mod prober;
/// Accept loop and route dispatch.
pub mod server;
/// Shared application state.
pub mod state;
