//! Seeded pseudo-random generator for all simulation-affecting choices.
//!
//! Every random decision in the core (AI rolls, weapon spread, fleet layout,
//! reinforcement picks, particle bursts) draws from a [`Generator`] owned by
//! the simulation. Nothing reads system entropy, so a seed plus the same
//! sequence of calls reproduces a battle exactly on any platform.
//!
//! The generator is mulberry32: a 32-bit counter advanced by a fixed odd
//! increment and pushed through an integer mixing function.

use serde::{Deserialize, Serialize};

/// Weyl increment applied to the state on every draw.
const INCREMENT: u32 = 0x6D2B_79F5;

/// 2^32 as a float, used to map `u32` output into `[0, 1)`.
const U32_SPAN: f64 = 4_294_967_296.0;

/// Deterministic integer-mixing generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Generator {
    state: u32,
}

impl Generator {
    /// Create a generator positioned at `seed`.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Reset the internal state to `seed`.
    pub fn seed(&mut self, seed: u32) {
        self.state = seed;
    }

    /// Current internal state. Feeding it back to [`Generator::new`] resumes
    /// the sequence from this point.
    #[must_use]
    pub const fn state(&self) -> u32 {
        self.state
    }

    /// Advance and return the next raw 32-bit value.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Advance and return a value in `[0, 1)`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> f64 {
        f64::from(self.next_u32()) / U32_SPAN
    }

    /// Value in `[lo, hi)`.
    pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next()
    }

    /// Symmetric jitter in `[-amount, amount)`.
    pub fn jitter(&mut self, amount: f64) -> f64 {
        self.range(-amount, amount)
    }

    /// Integer in `[lo, hi]` (both ends inclusive).
    pub fn int_range(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo + 1) as f64;
        lo + (self.next() * span).floor() as i64
    }

    /// Returns `true` with probability `p`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next() < p
    }

    /// Pick one element uniformly. Consumes a draw only when `items` is non-empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = (self.next() * items.len() as f64) as usize;
        items.get(idx.min(items.len() - 1))
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Non-positive weights are never chosen. Returns `None` if no weight is
    /// positive.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.next() * total;
        let mut last_positive = None;
        for (i, &w) in weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            if roll < w {
                return Some(i);
            }
            roll -= w;
            last_positive = Some(i);
        }
        last_positive
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(1)
    }
}

/// FNV-1a hash of a label, used to derive per-team seeds.
#[must_use]
pub fn hash_label(label: &str) -> u32 {
    let mut hash: u32 = 0x811C_9DC5;
    for byte in label.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sequence() {
        let mut rng = Generator::new(1);
        assert_eq!(rng.next_u32(), 2_693_262_067);
        assert_eq!(rng.next_u32(), 11_749_833);
        assert_eq!(rng.next_u32(), 2_265_367_787);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Generator::new(42);
        let mut b = Generator::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next().to_bits(), b.next().to_bits());
        }
    }

    #[test]
    fn test_reseed_restarts_sequence() {
        let mut rng = Generator::new(7);
        let first: Vec<u32> = (0..5).map(|_| rng.next_u32()).collect();
        rng.seed(7);
        let second: Vec<u32> = (0..5).map(|_| rng.next_u32()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unit_interval() {
        let mut rng = Generator::new(99);
        for _ in 0..10_000 {
            let v = rng.next();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_int_range_inclusive() {
        let mut rng = Generator::new(3);
        let mut seen = [false; 3];
        for _ in 0..500 {
            let v = rng.int_range(1, 3);
            assert!((1..=3).contains(&v));
            seen[(v - 1) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert_eq!(rng.int_range(5, 5), 5);
    }

    #[test]
    fn test_weighted_index_skips_zero_weights() {
        let mut rng = Generator::new(11);
        for _ in 0..200 {
            let idx = rng.weighted_index(&[0.0, 2.0, 0.0, 1.0]).unwrap();
            assert!(idx == 1 || idx == 3);
        }
        assert_eq!(rng.weighted_index(&[0.0, -1.0]), None);
    }

    #[test]
    fn test_pick_empty() {
        let mut rng = Generator::new(5);
        let before = rng.state();
        let empty: [u8; 0] = [];
        assert!(rng.pick(&empty).is_none());
        assert_eq!(rng.state(), before);
    }

    #[test]
    fn test_hash_label() {
        assert_eq!(hash_label("red"), 1_089_765_596);
        assert_eq!(hash_label("blue"), 2_197_550_541);
    }
}
