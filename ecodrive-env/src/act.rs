//! Actions and the uniform random baseline policy.
use crate::env::CarFollowEnv;
use ecodrive_core::{Act, Configurable, Policy};
use serde::{Deserialize, Serialize};

/// The scalar longitudinal acceleration command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CarFollowAct(pub f64);

impl Act for CarFollowAct {
    fn len(&self) -> usize {
        1
    }
}

impl From<f64> for CarFollowAct {
    fn from(a: f64) -> Self {
        Self(a)
    }
}

/// A policy sampling actions uniformly from `[a_min, a_max]`, for
/// exploration and random-policy baselines.
pub struct RandomPolicy {
    rng: fastrand::Rng,
    a_min: f64,
    a_max: f64,
}

impl RandomPolicy {
    /// Creates a uniform random policy over `[a_min, a_max]`.
    pub fn new(a_min: f64, a_max: f64, seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            a_min,
            a_max,
        }
    }
}

impl Policy<CarFollowEnv> for RandomPolicy {
    fn sample(&mut self, _obs: &<CarFollowEnv as ecodrive_core::Env>::Obs) -> CarFollowAct {
        CarFollowAct(self.a_min + (self.a_max - self.a_min) * self.rng.f64())
    }
}

/// Configuration of [`RandomPolicy`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomPolicyConfig {
    /// Lower action bound.
    pub a_min: f64,

    /// Upper action bound.
    pub a_max: f64,

    /// Random seed.
    pub seed: u64,
}

impl Default for RandomPolicyConfig {
    fn default() -> Self {
        Self {
            a_min: -3.0,
            a_max: 3.0,
            seed: 0,
        }
    }
}

impl Configurable for RandomPolicy {
    type Config = RandomPolicyConfig;

    fn build(config: Self::Config) -> Self {
        Self::new(config.a_min, config.a_max, config.seed)
    }
}
