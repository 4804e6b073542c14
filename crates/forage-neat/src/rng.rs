//! Run-scoped randomness for evolution
//!
//! Every wiring, mutation and selection draw goes through one generator that is
//! seeded once per run and threaded through the engine as `&mut R`:
//! - seeded [`RunRng`] for reproducible runs and tests
//! - any other `rand::Rng` when the host owns its own source

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Generator used for a whole evolutionary run
pub type RunRng = Xoshiro256StarStar;

/// Create the run generator, from a fixed seed when one is given
pub fn run_rng(seed: Option<u64>) -> RunRng {
    match seed {
        Some(seed) => RunRng::seed_from_u64(seed),
        None => RunRng::from_rng(&mut rand::rng()),
    }
}

/// Draws used by the evolution operators
pub trait NeatRng {
    /// Uniform weight in [-1.0, 1.0]
    fn signed_weight(&mut self) -> f64;

    /// Uniform weight in [0.0, 1.0)
    fn unit_weight(&mut self) -> f64;

    /// Uniform perturbation in [-power, power]
    fn perturbation(&mut self, power: f64) -> f64;

    /// Check if random value is less than probability threshold
    fn check_probability(&mut self, probability: f64) -> bool;

    /// Uniform index into a non-empty collection of `len` elements
    fn pick_index(&mut self, len: usize) -> usize;
}

impl<T: ?Sized + Rng> NeatRng for T {
    fn signed_weight(&mut self) -> f64 {
        self.random_range(-1.0..=1.0)
    }

    fn unit_weight(&mut self) -> f64 {
        self.random::<f64>()
    }

    fn perturbation(&mut self, power: f64) -> f64 {
        if power <= 0.0 {
            return 0.0;
        }
        self.random_range(-power..=power)
    }

    fn check_probability(&mut self, probability: f64) -> bool {
        self.random::<f64>() < probability
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.random_range(0..len)
    }
}
