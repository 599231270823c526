//! Weighted random backend selection with health filtering (spec §4.3).

use rand::Rng;

/// A candidate backend as seen by the selector: name, effective weight,
/// and current health.
pub type Candidate = (String, f64, bool);

/// Select one backend from `candidates` using weighted random selection
/// with health filtering and degradation fallback.
///
/// Implements spec §4.3 steps 2-4:
///   1. Prefer healthy candidates; if none are healthy, degrade to the
///      full candidate set (P5: always returns something unless the
///      input is empty).
///   2. If total weight is non-positive, select uniformly at random.
///   3. Otherwise draw `r` in `[0, total)` and walk candidates in stable
///      name order, picking the first whose cumulative weight covers `r`.
///
/// Returns `None` only when `candidates` is empty.
pub fn select<R: Rng + ?Sized>(candidates: &[Candidate], rng: &mut R) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let healthy: Vec<&Candidate> = candidates.iter().filter(|(_, _, h)| *h).collect();
    let pool: Vec<&Candidate> = if healthy.is_empty() {
        candidates.iter().collect()
    } else {
        healthy
    };

    let mut sorted = pool.clone();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let total: f64 = sorted.iter().map(|(_, w, _)| w.max(0.0)).sum();

    if total <= 0.0 {
        let idx = rng.gen_range(0..sorted.len());
        return Some(sorted[idx].0.clone());
    }

    let r: f64 = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for (name, w, _) in &sorted {
        cumulative += w.max(0.0);
        if cumulative >= r {
            return Some(name.clone());
        }
    }

    // Floating point rounding can leave `r` a hair past the last
    // cumulative boundary; fall back to the last candidate.
    sorted.last().map(|(name, _, _)| name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn empty_candidates_returns_none() {
        assert_eq!(select(&[], &mut rng()), None);
    }

    #[test]
    fn excludes_unhealthy_when_healthy_exists() {
        let candidates = vec![
            ("b1".to_string(), 1.0, true),
            ("b2".to_string(), 1.0, false),
        ];
        let mut r = rng();
        for _ in 0..200 {
            let picked = select(&candidates, &mut r).unwrap();
            assert_eq!(picked, "b1");
        }
    }

    #[test]
    fn degrades_to_all_when_none_healthy() {
        let candidates = vec![
            ("b1".to_string(), 1.0, false),
            ("b2".to_string(), 1.0, false),
        ];
        let mut r = rng();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(select(&candidates, &mut r).unwrap());
        }
        assert!(seen.contains("b1") || seen.contains("b2"));
    }

    #[test]
    fn zero_total_weight_selects_uniformly() {
        let candidates = vec![
            ("b1".to_string(), 0.0, true),
            ("b2".to_string(), 0.0, true),
        ];
        let mut r = rng();
        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..2000 {
            *counts.entry(select(&candidates, &mut r).unwrap()).or_default() += 1;
        }
        assert!(counts.len() == 2);
    }

    #[test]
    fn selection_distribution_matches_weights() {
        // Scenario S1: ewma_ms = {50, 100, 200} -> inverse-latency weights.
        let candidates = vec![
            ("b1".to_string(), 1.0 / 0.050, true),
            ("b2".to_string(), 1.0 / 0.100, true),
            ("b3".to_string(), 1.0 / 0.200, true),
        ];
        let mut r = rng();
        let mut counts: HashMap<String, u32> = HashMap::new();
        let draws = 20_000;
        for _ in 0..draws {
            *counts.entry(select(&candidates, &mut r).unwrap()).or_default() += 1;
        }

        let freq = |name: &str| *counts.get(name).unwrap_or(&0) as f64 / draws as f64;
        assert!((freq("b1") - 0.571).abs() < 0.03);
        assert!((freq("b2") - 0.286).abs() < 0.03);
        assert!((freq("b3") - 0.143).abs() < 0.03);
    }

    #[test]
    fn never_selects_unhealthy_given_a_healthy_option() {
        let candidates = vec![
            ("b1".to_string(), 5.0, true),
            ("b2".to_string(), 100.0, false),
        ];
        let mut r = rng();
        for _ in 0..5000 {
            assert_eq!(select(&candidates, &mut r).unwrap(), "b1");
        }
    }
}
