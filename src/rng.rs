//! Random number service of the simulation.
//!
//! Every stochastic decision of a run goes through a single [`RandomSource`]
//! owned by the model, so that a seed fully determines the trajectory.

use crate::error::ModelError;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Binomial, Uniform};

/// Source of the draws needed by the model.
///
/// Implementations must be deterministic for a given seed: the model calls
/// them in a fixed order (agents, then groups, in storage order).
pub trait RandomSource {
    /// Draw from `Binomial(n, p)`.
    fn binomial_draw(&mut self, n: u64, p: f64) -> Result<u64, ModelError>;

    /// Draw from `Uniform(a, b)`, `b` excluded.
    fn uniform_draw(&mut self, a: f64, b: f64) -> Result<f64, ModelError>;

    /// Number of draws taken so far.
    fn n_draws(&self) -> u64;

    /// Draw from `Uniform(0, 1)`.
    fn unit_draw(&mut self) -> Result<f64, ModelError> {
        self.uniform_draw(0.0, 1.0)
    }
}

/// Seeded ChaCha stream.
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: ChaCha12Rng,
    n_draws: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha12Rng::seed_from_u64(seed),
            n_draws: 0,
        }
    }
}

impl RandomSource for SeededRng {
    fn binomial_draw(&mut self, n: u64, p: f64) -> Result<u64, ModelError> {
        let dist = Binomial::new(n, p)?;
        self.n_draws += 1;
        Ok(dist.sample(&mut self.rng))
    }

    fn uniform_draw(&mut self, a: f64, b: f64) -> Result<f64, ModelError> {
        let dist = Uniform::new(a, b)?;
        self.n_draws += 1;
        Ok(dist.sample(&mut self.rng))
    }

    fn n_draws(&self) -> u64 {
        self.n_draws
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// Fixed-sequence stand-in for [`SeededRng`].
    ///
    /// Uniform draws are served from a script (0.5 once it runs out) and
    /// binomial draws return `n` when `p >= 0.5`, else 0. Every binomial
    /// call is recorded.
    #[derive(Debug, Default)]
    pub struct ScriptedRng {
        pub uniforms: VecDeque<f64>,
        pub binomial_calls: Vec<(u64, f64)>,
        pub n_draws: u64,
    }

    impl ScriptedRng {
        pub fn with_uniforms(uniforms: &[f64]) -> Self {
            Self {
                uniforms: uniforms.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl RandomSource for ScriptedRng {
        fn binomial_draw(&mut self, n: u64, p: f64) -> Result<u64, ModelError> {
            self.n_draws += 1;
            self.binomial_calls.push((n, p));
            Ok(if p >= 0.5 { n } else { 0 })
        }

        fn uniform_draw(&mut self, a: f64, b: f64) -> Result<f64, ModelError> {
            self.n_draws += 1;
            let u = self.uniforms.pop_front().unwrap_or(0.5);
            Ok(a + (b - a) * u)
        }

        fn n_draws(&self) -> u64 {
            self.n_draws
        }
    }
}
