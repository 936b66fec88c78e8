//! Environment step.
use super::Env;

/// Additional information attached to [`Step`], defined per environment.
pub trait Info {}

impl Info for () {}

/// The result of one environment interaction: `(a_t, o_{t+1}, r_t)` plus
/// episode-end flags.
pub struct Step<E: Env> {
    /// Action applied at this step.
    pub act: E::Act,

    /// Observation after the step.
    pub obs: E::Obs,

    /// Reward received for the step.
    pub reward: f64,

    /// The episode ended by reaching its terminal condition.
    pub is_terminated: bool,

    /// The episode ended without reaching its terminal condition.
    pub is_truncated: bool,

    /// Information defined by the environment.
    pub info: E::Info,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: E::Obs,
        act: E::Act,
        reward: f64,
        is_terminated: bool,
        is_truncated: bool,
        info: E::Info,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
            info,
        }
    }

    /// Terminated or truncated.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}
