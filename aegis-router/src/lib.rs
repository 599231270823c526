//! Library surface for the `aegis-router` binary.
//!
//! Split out from `main.rs` so integration tests can drive the real HTTP
//! surface over a loopback listener instead of re-implementing it.

#![deny(missing_docs)]

/// CLI/env configuration.
pub mod config;
/// Router-local error wrapping.
pub mod error;
/// Request forwarding with retry-once and fire-and-forget recording.
pub mod forward;
/// Prometheus metrics exposition.
pub mod metrics;
/// Background weight poller.
pub mod poller;
/// Backend selection, including the uniform-fallback rule.
pub mod selection;
/// Accept loop and route dispatch.
pub mod server;
/// Shared application state.
pub mod state;
