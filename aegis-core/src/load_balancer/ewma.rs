//! Lock-free exponentially-weighted moving average for backend latency.
//!
//! Generalized from a Peak-EWMA tracker: this variant applies the plain
//! convex-combination update rule (`ewma <- alpha*x + (1-alpha)*ewma`)
//! with no peak-jump branch, since the convexity invariant (the result
//! stays within `[min, max]` of the observed samples) would otherwise be
//! violated on recovery from a spike.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sentinel bit pattern meaning "no sample observed yet".
fn absent_bits() -> u64 {
    f64::NAN.to_bits()
}

/// A lock-free, atomically-updated EWMA.
#[derive(Debug)]
pub struct Ewma {
    /// Current average, stored as the bits of an `f64` for lock-free CAS
    /// updates. `NaN` means "absent" (no sample yet).
    bits: AtomicU64,
}

impl Default for Ewma {
    fn default() -> Self {
        Self::new()
    }
}

impl Ewma {
    /// Create an `Ewma` with no samples yet.
    pub fn new() -> Self {
        Self {
            bits: AtomicU64::new(absent_bits()),
        }
    }

    /// Read the current average, or `None` if no sample has been applied.
    pub fn get(&self) -> Option<f64> {
        let v = f64::from_bits(self.bits.load(Ordering::Acquire));
        if v.is_nan() {
            None
        } else {
            Some(v)
        }
    }

    /// Apply a new sample using the convex-combination update rule.
    /// The first sample seeds the average directly. Returns the new value.
    pub fn observe(&self, sample: f64, alpha: f64) -> f64 {
        let mut current_bits = self.bits.load(Ordering::Acquire);

        loop {
            let current = f64::from_bits(current_bits);

            let next = if current.is_nan() {
                sample
            } else {
                alpha * sample + (1.0 - alpha) * current
            };

            let next_bits = next.to_bits();

            match self.bits.compare_exchange_weak(
                current_bits,
                next_bits,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(updated_bits) => current_bits = updated_bits,
            }
        }
    }

    /// Apply the unhealthy-decay penalty: multiply the existing average
    /// by `factor`, or seed it at `seed` if absent. Returns the new value.
    pub fn decay(&self, factor: f64, seed: f64) -> f64 {
        let mut current_bits = self.bits.load(Ordering::Acquire);

        loop {
            let current = f64::from_bits(current_bits);

            let next = if current.is_nan() { seed } else { current * factor };
            let next_bits = next.to_bits();

            match self.bits.compare_exchange_weak(
                current_bits,
                next_bits,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(updated_bits) => current_bits = updated_bits,
            }
        }
    }

    /// Force the average to an exact value (used by tests and state restore).
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }
}
