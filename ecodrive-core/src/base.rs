//! Core traits: observations, actions, environments and policies.
mod env;
mod policy;
mod step;

pub use env::Env;
pub use policy::{Configurable, Policy};
use std::fmt::Debug;
pub use step::{Info, Step};

/// An observation of an environment.
///
/// Observations may hold several rows at once when used for batched
/// evaluation of the dynamics; a single interaction step always carries
/// exactly one row.
pub trait Obs: Clone + Debug {
    /// Returns the number of rows in the observation.
    fn len(&self) -> usize;

    /// Returns `true` if the observation holds no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An action applied to an environment.
pub trait Act: Clone + Debug {
    /// Returns the number of rows in the action.
    fn len(&self) -> usize;
}
