//! Injectable randomness for trigger decisions.
//!
//! Every probabilistic rule in the engine (trigger throttle, kind choice,
//! snooze re-roll, streak bonus) draws from a [`RandomSource`] passed in by
//! the caller, so tests can substitute a deterministic sequence and assert
//! exact transitions instead of sampling.

use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;

/// Source of uniform randomness for engine decisions.
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform index in `[0, len)`. Returns 0 for an empty range.
    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let idx = (self.next_f64() * len as f64) as usize;
        idx.min(len - 1)
    }
}

/// Production randomness backed by a PCG generator.
pub struct PcgSource {
    rng: Mcg128Xsl64,
}

impl PcgSource {
    /// Seed from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mcg128Xsl64::from_entropy(),
        }
    }

    /// Fixed seed, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mcg128Xsl64::seed_from_u64(seed),
        }
    }
}

impl RandomSource for PcgSource {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Deterministic xorshift64* generator for tests and simulation.
#[derive(Debug, Clone, Copy)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        // a zero state is a fixed point of xorshift
        let state = if seed == 0 { 0x9e37_79b9_7f4a_7c15 } else { seed };
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }
}

impl RandomSource for XorShift64 {
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}
