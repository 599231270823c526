//! Backend Registry & State Store (spec §4.1) and the manual override map.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;

use crate::config::clamp_weight;
use crate::domain::backend::Backend;
use crate::domain::state::BackendState;
use crate::error::{AegisError, Result};

/// An immutable point-in-time view of one backend, used to serve
/// `/weights` and metrics without holding the registry lock.
#[derive(Debug, Clone)]
pub struct BackendSnapshot {
    /// The backend's name.
    pub name: String,
    /// EWMA latency in seconds, if any sample has been observed.
    pub ewma_latency_s: Option<f64>,
    /// Whether the backend is currently healthy.
    pub healthy: bool,
    /// Total samples applied.
    pub sample_count: u64,
}

/// One entry per known backend: identity plus mutable telemetry.
struct Entry {
    backend: Backend,
    state: BackendState,
}

/// Pure in-memory state keyed by backend name (spec §4.1).
///
/// Concurrency: backed by a sharded [`DashMap`], so mutations to distinct
/// backends never contend; mutations to the same backend serialize
/// through [`BackendState`]'s lock-free CAS updates. `snapshot()` takes an
/// independent copy of each entry's fields rather than holding any shard
/// lock across the copy, so it can never observe a torn update.
#[derive(Default)]
pub struct BackendRegistry {
    entries: DashMap<String, Entry>,
    default_alpha: f64,
}

impl BackendRegistry {
    /// Create a registry pre-populated from the configured backend list.
    pub fn new<I, S, E>(initial: I, default_alpha: f64) -> Self
    where
        I: IntoIterator<Item = (S, E)>,
        S: Into<String>,
        E: Into<String>,
    {
        let entries = DashMap::new();
        for (name, endpoint) in initial {
            let name = name.into();
            entries.insert(
                name.clone(),
                Entry {
                    backend: Backend::new(name, endpoint.into()),
                    state: BackendState::new(default_alpha),
                },
            );
        }
        Self {
            entries,
            default_alpha,
        }
    }

    /// Apply a latency sample from a probe. Creates the backend (with no
    /// known endpoint) if it doesn't already exist. `latency_s` must be
    /// finite and non-negative or this returns `BadSample`.
    pub fn add_sample(&self, name: &str, latency_s: f64) -> Result<()> {
        self.validate_latency(name, latency_s)?;
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| Entry {
                backend: Backend::without_endpoint(name),
                state: BackendState::new(self.default_alpha),
            })
            .state
            .add_sample(latency_s);
        Ok(())
    }

    /// Apply a latency sample from an inbound `/record` post. Like
    /// `add_sample`, but `success` governs health instead of an
    /// unconditional `healthy = true`: a successful record (`success`)
    /// recovers health same as a probe (spec §4.2 state machine,
    /// "Unhealthy -> Healthy on any successful probe or record"), while a
    /// failing record never flips health to unhealthy by itself — only
    /// the probe loop may do that (spec §4.2: "MUST NOT mark the backend
    /// unhealthy by itself").
    pub fn add_record_sample(&self, name: &str, latency_s: f64, success: bool) -> Result<()> {
        self.validate_latency(name, latency_s)?;
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| Entry {
                backend: Backend::without_endpoint(name),
                state: BackendState::new(self.default_alpha),
            })
            .state
            .add_record_sample(latency_s, success);
        Ok(())
    }

    fn validate_latency(&self, name: &str, latency_s: f64) -> Result<()> {
        if !latency_s.is_finite() || latency_s < 0.0 {
            return Err(AegisError::BadSample {
                backend: name.to_string(),
                reason: format!("latency_s must be finite and >= 0, got {latency_s}"),
            });
        }
        Ok(())
    }

    /// Mark a backend unhealthy, creating it first if unknown.
    pub fn mark_unhealthy(&self, name: &str) {
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| Entry {
                backend: Backend::without_endpoint(name),
                state: BackendState::new(self.default_alpha),
            })
            .state
            .mark_unhealthy();
    }

    /// Mark a backend healthy (e.g. after a successful probe), creating it
    /// first if unknown.
    pub fn mark_healthy(&self, name: &str) {
        self.entries
            .entry(name.to_string())
            .or_insert_with(|| Entry {
                backend: Backend::without_endpoint(name),
                state: BackendState::new(self.default_alpha),
            })
            .state
            .mark_healthy();
    }

    /// An immutable copy of the full state map.
    pub fn snapshot(&self) -> HashMap<String, BackendSnapshot> {
        self.entries
            .iter()
            .map(|entry| {
                let name = entry.key().clone();
                let snap = BackendSnapshot {
                    name: name.clone(),
                    ewma_latency_s: entry.value().state.ewma_latency_s(),
                    healthy: entry.value().state.is_healthy(),
                    sample_count: entry.value().state.sample_count(),
                };
                (name, snap)
            })
            .collect()
    }

    /// The subset of backends that have a probeable endpoint.
    pub fn probe_targets(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .backend
                    .endpoint
                    .clone()
                    .map(|ep| (entry.key().clone(), ep))
            })
            .collect()
    }

    /// Number of known backends.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no known backends.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A mapping from backend name to a manually-overridden weight.
///
/// When non-empty it wholly replaces derived weights for weight queries
/// (spec invariant I3). Backed by [`ArcSwap`] so a writer's wholesale
/// replacement is atomic: a reader's `get()` observes either the entire
/// old map or the entire new one, never a mix (spec §5 ordering
/// guarantee), generalizing the same tool the teacher's routing table
/// already used for atomic backend-topology swaps.
#[derive(Debug)]
pub struct ManualOverrideMap {
    inner: ArcSwap<HashMap<String, f64>>,
}

impl Default for ManualOverrideMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualOverrideMap {
    /// Create an empty override map.
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Replace the map wholesale with `values`, clamping each value to
    /// `[MIN_WEIGHT, MAX_WEIGHT]`. Returns the clamped map that was stored.
    pub fn set(&self, values: HashMap<String, f64>) -> HashMap<String, f64> {
        let clamped: HashMap<String, f64> = values
            .into_iter()
            .map(|(k, v)| (k, clamp_weight(v)))
            .collect();
        self.inner.store(Arc::new(clamped.clone()));
        clamped
    }

    /// Like [`ManualOverrideMap::set`], but with operator-configured clamp
    /// bounds instead of the package defaults (spec §6: `MIN_WEIGHT` and
    /// `MAX_WEIGHT` are configuration, not invariants).
    pub fn set_with_bounds(&self, values: HashMap<String, f64>, min: f64, max: f64) -> HashMap<String, f64> {
        let clamped: HashMap<String, f64> = values
            .into_iter()
            .map(|(k, v)| (k, v.clamp(min, max)))
            .collect();
        self.inner.store(Arc::new(clamped.clone()));
        clamped
    }

    /// Clear all overrides (equivalent to `DELETE /weights` or an empty POST).
    pub fn clear(&self) {
        self.inner.store(Arc::new(HashMap::new()));
    }

    /// The current override map.
    pub fn get(&self) -> Arc<HashMap<String, f64>> {
        self.inner.load_full()
    }

    /// Whether there are currently no overrides.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sample_creates_unknown_backend() {
        let reg = BackendRegistry::new(Vec::<(String, String)>::new(), 0.2);
        reg.add_sample("b4", 0.08).unwrap();
        let snap = reg.snapshot();
        let b4 = snap.get("b4").unwrap();
        assert_eq!(b4.ewma_latency_s, Some(0.08));
        assert!(b4.healthy);
    }

    #[test]
    fn bad_sample_rejected() {
        let reg = BackendRegistry::new(Vec::<(String, String)>::new(), 0.2);
        assert!(reg.add_sample("b1", -1.0).is_err());
        assert!(reg.add_sample("b1", f64::NAN).is_err());
        assert!(reg.add_sample("b1", f64::INFINITY).is_err());
    }

    #[test]
    fn failing_record_never_flips_to_unhealthy() {
        let reg = BackendRegistry::new(vec![("b1", "http://b1")], 0.2);
        reg.mark_unhealthy("b1");
        reg.add_record_sample("b1", 0.5, false).unwrap();
        assert!(!reg.snapshot().get("b1").unwrap().healthy);
    }

    #[test]
    fn successful_record_recovers_health() {
        let reg = BackendRegistry::new(vec![("b1", "http://b1")], 0.2);
        reg.mark_unhealthy("b1");
        reg.add_record_sample("b1", 0.5, true).unwrap();
        assert!(reg.snapshot().get("b1").unwrap().healthy);
    }

    #[test]
    fn override_map_clamps_and_replaces_wholesale() {
        let m = ManualOverrideMap::new();
        let mut values = HashMap::new();
        values.insert("b1".to_string(), 10.0);
        values.insert("b2".to_string(), 10.0);
        values.insert("b3".to_string(), 0.0);

        let applied = m.set(values);
        assert_eq!(applied.get("b3"), Some(&0.05));
        assert_eq!(applied.get("b1"), Some(&10.0));

        m.clear();
        assert!(m.is_empty());
    }

    proptest::proptest! {
        /// P7: whatever is POSTed to the override map, every stored value
        /// ends up inside `[min, max]`.
        #[test]
        fn prop_set_with_bounds_always_clamps(
            raw in proptest::collection::hash_map("[a-z]{1,6}", -1000.0f64..1000.0, 0..8),
            min in 0.01f64..1.0,
            max in 1.0f64..100.0,
        ) {
            let m = ManualOverrideMap::new();
            let applied = m.set_with_bounds(raw, min, max);
            for v in applied.values() {
                proptest::prop_assert!(*v >= min - 1e-12 && *v <= max + 1e-12);
            }
        }
    }
}
