//! EMA smoothing over successive target weight maps, ported from
//! `original_source/bench/autoscaler.py`'s `SmoothStore`.

use std::collections::HashMap;

/// Smooths each backend's target weight against its own previous smoothed
/// value: `smoothed = alpha * new + (1 - alpha) * smoothed_prev`. A
/// backend seen for the first time is seeded directly at its target
/// value, matching the Python original.
pub struct SmoothStore {
    alpha: f64,
    store: HashMap<String, f64>,
}

impl SmoothStore {
    /// Create an empty store with the given smoothing constant.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            store: HashMap::new(),
        }
    }

    /// Fold `target` into the store and return the full smoothed map.
    pub fn update(&mut self, target: &HashMap<String, f64>) -> HashMap<String, f64> {
        for (k, v) in target {
            self.store
                .entry(k.clone())
                .and_modify(|prev| *prev = self.alpha * v + (1.0 - self.alpha) * *prev)
                .or_insert(*v);
        }
        self.store.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_unseen_backend_directly() {
        let mut s = SmoothStore::new(0.3);
        let mut target = HashMap::new();
        target.insert("b1".to_string(), 10.0);
        let out = s.update(&target);
        assert_eq!(out["b1"], 10.0);
    }

    #[test]
    fn smooths_towards_repeated_target() {
        let mut s = SmoothStore::new(0.5);
        let mut target = HashMap::new();
        target.insert("b1".to_string(), 10.0);
        s.update(&target);

        target.insert("b1".to_string(), 20.0);
        let out = s.update(&target);
        // 0.5*20 + 0.5*10 = 15
        assert!((out["b1"] - 15.0).abs() < 1e-9);
    }
}
