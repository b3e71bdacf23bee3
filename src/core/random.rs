//! Seeded numeric stream consumed by every generation stage
//!
//! Generation never touches a global RNG: the model owns one stream and
//! threads it through each stage, so a seed fully determines the output.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of floats, ints and booleans for the generator
pub trait RandomSource {
    /// Uniform float in `[0, 1)`
    fn float(&mut self) -> f64;

    /// Mean of three uniform floats, a cheap bell curve on `[0, 1)`
    fn normal(&mut self) -> f64 {
        (self.float() + self.float() + self.float()) / 3.0
    }

    /// Integer in `[min, max)`
    fn int(&mut self, min: i64, max: i64) -> i64 {
        (min as f64 + self.float() * (max - min) as f64).floor() as i64
    }

    /// Index in `[0, len)`, for picking from a non-empty slice
    fn index(&mut self, len: usize) -> usize {
        self.int(0, len as i64).max(0) as usize
    }

    /// True with probability `p`
    fn chance(&mut self, p: f64) -> bool {
        self.float() < p
    }

    /// Value around 0.5 whose spread grows with `f`
    fn fuzzy(&mut self, f: f64) -> f64 {
        if f == 0.0 {
            0.5
        } else {
            (1.0 - f) / 2.0 + f * self.normal()
        }
    }
}

impl RandomSource for ChaCha8Rng {
    fn float(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Default stream for a seed
pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
