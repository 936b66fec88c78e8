#![warn(missing_docs)]
//! Core abstractions for the ecodrive car-following environment.
//!
//! This crate defines the contract between an environment and the
//! (external) learning algorithm that consumes it: observations, actions,
//! environment steps and policies, together with a small record type for
//! logging metrics. Concrete environments live in `ecodrive-env`.
pub mod error;
pub mod record;

mod base;
pub use base::{Act, Configurable, Env, Info, Obs, Policy, Step};

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};
