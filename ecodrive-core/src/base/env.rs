//! Environment.
use super::{Act, Info, Obs, Step};
use crate::record::Record;
use anyhow::Result;

/// An environment, typically an MDP.
///
/// One instance simulates one episode at a time; [`Env::reset`] replaces
/// the episode state wholesale, so successive episodes do not leak state.
pub trait Env {
    /// Configuration used to build the environment.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Additional information attached to each [`Step`].
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: u64) -> Result<Self>
    where
        Self: Sized;

    /// Starts a new episode and returns the initial observation.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Starts a new episode selected by an index.
    ///
    /// The index is used in an arbitrary, environment-defined way, for
    /// example to reseed episode randomization during evaluation. The
    /// default implementation ignores it.
    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs> {
        let _ = ix;
        self.reset()
    }

    /// Performs one environment step.
    fn step(&mut self, act: &Self::Act) -> (Step<Self>, Record)
    where
        Self: Sized;
}
