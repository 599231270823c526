//! Backend selection (spec §4.3 "Selection algorithm").
//!
//! Wraps `aegis_core::load_balancer::selector::select` with two
//! router-specific behaviors: falling back to a uniform draw over the
//! statically configured backend list when the manager has never been
//! reached at all (spec §4.3, scenario S6), and excluding a named
//! backend from the draw so a retry can land on a different backend
//! (spec §4.3 "retry on a different backend once"). Neither is folded
//! into `aegis-core`'s selector, which always assumes a non-empty,
//! already-resolved candidate list with no notion of exclusion.

use aegis_core::Candidate;
use rand::Rng;

use crate::error::RouterError;
use crate::state::AppState;

/// Choose a backend name for the next forward.
///
/// Returns `Err(RouterError::NoCandidate)` only when there is truly
/// nothing to choose from (no cached weights and no configured backend
/// list) — spec §7 "No candidate".
pub fn choose_backend<R: Rng + ?Sized>(
    state: &AppState,
    rng: &mut R,
) -> Result<String, RouterError> {
    choose_backend_excluding(state, rng, None)
}

/// Like [`choose_backend`], but drops `exclude` from the candidate pool
/// before the weighted draw (spec §4.3: a retry is "on a different
/// backend" — excluding the backend that just failed is what makes the
/// retry meaningful rather than a second draw that can reselect it).
///
/// Returns `Err(RouterError::NoCandidate)` when excluding leaves nothing
/// to choose from, e.g. a single configured backend. The caller treats
/// that as "no different backend to retry against" rather than an error
/// surfaced to the client.
pub fn choose_backend_excluding<R: Rng + ?Sized>(
    state: &AppState,
    rng: &mut R,
    exclude: Option<&str>,
) -> Result<String, RouterError> {
    let snapshot = state.weights.load();

    if let Some(snapshot) = snapshot.as_ref() {
        let candidates: Vec<Candidate> = snapshot
            .to_candidates()
            .into_iter()
            .filter(|(name, _, _)| exclude != Some(name.as_str()))
            .collect();
        if let Some(name) = aegis_core::select(&candidates, rng) {
            return Ok(name);
        }
    }

    // Either we've never polled successfully, or the cached snapshot (an
    // empty weights map, or one emptied out by the exclusion) yields no
    // candidate. Either way, fall back to the statically configured
    // backend list, still honoring the exclusion.
    uniform_fallback(state, rng, exclude)
}

fn uniform_fallback<R: Rng + ?Sized>(
    state: &AppState,
    rng: &mut R,
    exclude: Option<&str>,
) -> Result<String, RouterError> {
    let pool: Vec<&str> = state
        .configured_backends
        .iter()
        .map(|b| b.name.as_str())
        .filter(|name| exclude != Some(*name))
        .collect();

    if pool.is_empty() {
        return Err(RouterError::NoCandidate);
    }

    let idx = rng.gen_range(0..pool.len());
    Ok(pool[idx].to_string())
}
