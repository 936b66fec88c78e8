//! Evaluate a [`Policy`] on an [`Env`].
use crate::{record::Record, Env, Policy};
use anyhow::Result;
mod default_evaluator;
pub use default_evaluator::DefaultEvaluator;

/// Evaluates a [`Policy`].
pub trait Evaluator<E: Env> {
    /// Runs the policy on the environment and returns evaluation metrics.
    fn evaluate<P: Policy<E>>(&mut self, policy: &mut P) -> Result<Record>;
}
