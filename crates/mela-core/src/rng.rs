//! Deterministic noise source for synthetic ensembles.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Seeded generator used to build reproducible synthetic correlators.
///
/// Every raw key draws from its own substream, derived by hashing
/// `(master_seed, substream_id)` with SipHash-1-3 under zero keys, so adding a
/// key to an ensemble never changes the noise of the others.
#[derive(Debug, Clone)]
pub struct EnsembleRng {
    rng: StdRng,
}

impl EnsembleRng {
    /// Creates a generator from a master seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates the generator of one substream.
    pub fn substream(master_seed: u64, substream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, substream))
    }

    /// Draws a uniform value in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Draws a Gaussian value with the given mean and width (Box-Muller).
    pub fn normal(&mut self, mean: f64, sigma: f64) -> f64 {
        let u1 = self.uniform().max(f64::MIN_POSITIVE);
        let u2 = self.uniform();
        let radius = (-2.0 * u1.ln()).sqrt();
        mean + sigma * radius * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// Derives the deterministic seed for a specific substream.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}

/// Folds an arbitrary label into a substream identifier.
pub fn substream_id(label: &str) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write(label.as_bytes());
    hasher.finish()
}
