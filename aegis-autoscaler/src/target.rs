//! Converts an observed `/weights` response into a normalized target
//! override map, ported from `compute_target_from_weights` in
//! `original_source/bench/autoscaler.py`.

use std::collections::HashMap;

use aegis_core::WeightsSnapshot;
use aegis_core::config::MIN_WEIGHT;

/// Flatten a `/weights` response into one observed value per backend,
/// regardless of which wire shape it came back as (spec §6: the
/// autoscaler "round-trips plain floats", the derived shape carries
/// `ewma_ms` instead).
///
/// For the derived shape this takes the EWMA latency in seconds (falling
/// back to 1.0s for a backend with no samples yet, matching the
/// manager's own "absent EWMA" default); for the override shape it uses
/// the value verbatim, exactly like the Python original's `Dict[str,
/// float]` assumption.
pub fn observed_map(snapshot: &WeightsSnapshot) -> HashMap<String, f64> {
    match snapshot {
        WeightsSnapshot::Override(m) => m.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        WeightsSnapshot::Derived(m) => m
            .iter()
            .map(|(k, entry)| (k.clone(), entry.ewma_ms.unwrap_or(1000.0) / 1000.0))
            .collect(),
    }
}

/// Re-derive a normalized target allocation (percentages summing to
/// ~100) from an observed map, heuristically treating small values as
/// latencies-to-invert the same way the Python original does.
pub fn compute_target(observed: &HashMap<String, f64>) -> HashMap<String, f64> {
    if observed.is_empty() {
        return HashMap::new();
    }

    // Heuristic carried over verbatim from the original: values that all
    // look like small latencies (0, 5) are inverted; anything else is
    // assumed to already be weight-shaped.
    let looks_like_latency = observed.values().all(|v| *v > 0.0 && v.abs() < 5.0);

    let inverted: HashMap<String, f64> = if looks_like_latency {
        observed
            .iter()
            .map(|(k, v)| (k.clone(), 1.0 / (v + 0.001)))
            .collect()
    } else {
        observed.clone()
    };

    let sum: f64 = inverted.values().sum();
    let sum = if sum > 0.0 { sum } else { 1.0 };

    inverted
        .into_iter()
        .map(|(k, v)| (k, (v / sum * 100.0).max(MIN_WEIGHT)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverts_small_values_as_latencies() {
        let mut observed = HashMap::new();
        observed.insert("b1".to_string(), 0.05);
        observed.insert("b2".to_string(), 0.2);

        let target = compute_target(&observed);
        // b1 has the smaller latency, so it should get the larger share.
        assert!(target["b1"] > target["b2"]);
        let total: f64 = target.values().sum();
        assert!((total - 100.0).abs() < 1e-6);
    }

    #[test]
    fn treats_large_values_as_already_weight_shaped() {
        let mut observed = HashMap::new();
        observed.insert("b1".to_string(), 50.0);
        observed.insert("b2".to_string(), 50.0);

        let target = compute_target(&observed);
        assert!((target["b1"] - target["b2"]).abs() < 1e-9);
    }

    #[test]
    fn empty_observed_yields_empty_target() {
        assert!(compute_target(&HashMap::new()).is_empty());
    }
}
