//! Injectable random sources.
//!
//! Everything stochastic in the kernel (name pools, search success, plates,
//! driver placement) draws through [`RandomSource`], so tests can replay a
//! fixed sequence and runs can be reproduced from a seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws in `[0, 1)`.
pub trait RandomSource: Send {
    /// Next uniform value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform index into a collection of `len` items. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "cannot pick from an empty pool");
        let idx = (self.next_unit() * len as f64).floor() as usize;
        idx.min(len.saturating_sub(1))
    }

    /// Bernoulli trial with success probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p
    }
}

/// [`RandomSource`] backed by a seedable [`StdRng`].
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is given, entropy-backed otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::new(seed),
            None => Self::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}
