//! Derived-weight computation and the `/weights` wire shapes.
//!
//! Resolves the spec's Open Question / REDESIGN FLAG: internally this is a
//! single tagged enum ([`WeightsSnapshot`]), but its `Serialize`/parsing
//! are hand-written to reproduce the two wire shapes spec §6 mandates —
//! flat `{name: number}` for manual overrides, nested
//! `{name: {ewma_ms, healthy}}` for derived weights — so external clients
//! observe no behavioral difference from the original service.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

use crate::config::{UNHEALTHY_WEIGHT_FLOOR, WEIGHT_EPSILON_S};
use crate::error::AegisError;

/// Compute the derived weight for a backend from its EWMA latency and
/// health (spec §3 "Derived weight").
pub fn derived_weight(ewma_latency_s: Option<f64>, healthy: bool) -> f64 {
    match ewma_latency_s {
        None => 1.0,
        Some(ewma) if healthy => 1.0 / (WEIGHT_EPSILON_S + ewma),
        Some(_) => UNHEALTHY_WEIGHT_FLOOR,
    }
}

/// One derived-shape entry in a `/weights` response.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedEntry {
    /// EWMA latency in milliseconds, or `None` before the first sample.
    pub ewma_ms: Option<f64>,
    /// Whether the backend is currently healthy.
    pub healthy: bool,
}

impl Serialize for DerivedEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("ewma_ms", &self.ewma_ms)?;
        // Wire form is 1/0, per spec §3.
        map.serialize_entry("healthy", &(self.healthy as u8))?;
        map.end()
    }
}

/// The result of a `/weights` query: either the manual override map
/// verbatim, or the derived per-backend view.
#[derive(Debug, Clone)]
pub enum WeightsSnapshot {
    /// Manual overrides are in force; returned verbatim (post-clamp).
    Override(BTreeMap<String, f64>),
    /// No overrides; weights are computed from EWMA + health.
    Derived(BTreeMap<String, DerivedEntry>),
}

impl Serialize for WeightsSnapshot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            WeightsSnapshot::Override(m) => m.serialize(serializer),
            WeightsSnapshot::Derived(m) => m.serialize(serializer),
        }
    }
}

impl WeightsSnapshot {
    /// Parse a `/weights` response body (as a generic JSON value) into a
    /// snapshot, accepting both wire shapes. Used by the router, which
    /// "must accept both shapes" (spec §4.3).
    pub fn from_json(value: &Value) -> Result<Self, AegisError> {
        let obj = value
            .as_object()
            .ok_or_else(|| AegisError::BadPayload("weights response must be a JSON object".into()))?;

        if obj.is_empty() {
            return Ok(WeightsSnapshot::Override(BTreeMap::new()));
        }

        // If every value is itself an object, this is the derived shape;
        // otherwise treat it as the flat override shape.
        let looks_derived = obj.values().all(Value::is_object);

        if looks_derived {
            let mut out = BTreeMap::new();
            for (k, v) in obj {
                let ewma_ms = v.get("ewma_ms").and_then(Value::as_f64);
                let healthy = v
                    .get("healthy")
                    .map(|h| match h {
                        Value::Bool(b) => *b,
                        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
                        _ => false,
                    })
                    .unwrap_or(false);
                out.insert(k.clone(), DerivedEntry { ewma_ms, healthy });
            }
            Ok(WeightsSnapshot::Derived(out))
        } else {
            let mut out = BTreeMap::new();
            for (k, v) in obj {
                let w = v
                    .as_f64()
                    .or_else(|| v.get("weight").and_then(Value::as_f64))
                    .unwrap_or(1.0);
                out.insert(k.clone(), w);
            }
            Ok(WeightsSnapshot::Override(out))
        }
    }

    /// Flatten this snapshot into `(name, effective_weight, healthy)`
    /// triples, ready for the selector (spec §4.3 step 1).
    pub fn to_candidates(&self) -> Vec<(String, f64, bool)> {
        match self {
            WeightsSnapshot::Override(m) => m
                .iter()
                .map(|(name, w)| {
                    (
                        name.clone(),
                        *w,
                        *w > crate::config::HEALTH_FLOOR,
                    )
                })
                .collect(),
            WeightsSnapshot::Derived(m) => m
                .iter()
                .map(|(name, entry)| {
                    let w = derived_weight(entry.ewma_ms.map(|ms| ms / 1000.0), entry.healthy);
                    (name.clone(), w, entry.healthy)
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn derived_weight_matches_spec_formula() {
        assert_eq!(derived_weight(None, true), 1.0);
        assert!((derived_weight(Some(0.0), true) - 1000.0).abs() < 1e-6);
        assert_eq!(derived_weight(Some(1.0), false), UNHEALTHY_WEIGHT_FLOOR);
    }

    #[test]
    fn parses_derived_shape() {
        let v = json!({"b1": {"ewma_ms": 50.0, "healthy": 1}, "b2": {"ewma_ms": null, "healthy": 0}});
        let snap = WeightsSnapshot::from_json(&v).unwrap();
        match snap {
            WeightsSnapshot::Derived(m) => {
                assert_eq!(m["b1"].ewma_ms, Some(50.0));
                assert!(m["b1"].healthy);
                assert_eq!(m["b2"].ewma_ms, None);
                assert!(!m["b2"].healthy);
            }
            _ => panic!("expected derived shape"),
        }
    }

    #[test]
    fn parses_override_shape() {
        let v = json!({"b1": 10.0, "b2": 0.05});
        let snap = WeightsSnapshot::from_json(&v).unwrap();
        match snap {
            WeightsSnapshot::Override(m) => {
                assert_eq!(m["b1"], 10.0);
                assert_eq!(m["b2"], 0.05);
            }
            _ => panic!("expected override shape"),
        }
    }

    #[test]
    fn empty_object_is_empty_override() {
        let v = json!({});
        let snap = WeightsSnapshot::from_json(&v).unwrap();
        match snap {
            WeightsSnapshot::Override(m) => assert!(m.is_empty()),
            _ => panic!("expected override shape"),
        }
    }

    #[test]
    fn serializes_derived_shape_with_numeric_health() {
        let mut m = BTreeMap::new();
        m.insert(
            "b1".to_string(),
            DerivedEntry {
                ewma_ms: Some(50.0),
                healthy: true,
            },
        );
        let snap = WeightsSnapshot::Derived(m);
        let s = serde_json::to_string(&snap).unwrap();
        assert_eq!(s, r#"{"b1":{"ewma_ms":50.0,"healthy":1}}"#);
    }
}
