use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// The single source of randomness for an entire simulation run. Every
/// stochastic decision — mining delays, message latency, node attribute
/// sampling, Bernoulli flags — must draw from the same `SimRng` instance so
/// that two runs started from the same seed are byte-identical.
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        Self { inner: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// A uniform draw in `(0, 1)`, excluding both endpoints so that it is
    /// always safe to feed into `ln`.
    pub fn uniform_open01(&mut self) -> f64 {
        loop {
            let u: f64 = self.inner.gen();
            if u > 0.0 && u < 1.0 {
                return u;
            }
        }
    }

    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.inner.gen_bool(p.clamp(0.0, 1.0))
    }

    pub fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        self.inner.gen_range(low..high)
    }

    /// Draws from `Normal(mean, stdev)`, truncated below at `floor`: values
    /// under the floor are resampled rather than clamped, matching a
    /// truncated-normal sampler rather than a clamped one.
    pub fn truncated_normal(&mut self, mean: f64, stdev: f64, floor: f64) -> f64 {
        let normal = Normal::new(mean, stdev).expect("invalid normal distribution parameters");
        loop {
            let sample = normal.sample(&mut self.inner);
            if sample >= floor {
                return sample;
            }
        }
    }

    /// Picks an index into `weights` proportionally (a discrete empirical
    /// distribution, used both for region assignment and for the CBR
    /// fallback block-size distribution).
    pub fn weighted_index(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        debug_assert!(total > 0.0, "weighted_index requires a non-empty, positive-sum distribution");
        let mut target = self.uniform_range(0.0, total);
        for (i, w) in weights.iter().enumerate() {
            if target < *w {
                return i;
            }
            target -= *w;
        }
        weights.len() - 1
    }
}
