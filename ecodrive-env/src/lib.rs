#![warn(missing_docs)]
//! A car-following longitudinal-control environment.
//!
//! The environment simulates an ego vehicle following a recorded (or
//! synthetic) preceding vehicle. At every reset a contiguous window of the
//! preceding vehicle's trace is selected, split into fixed-duration
//! segments, and each segment's future position profile is approximated by
//! a cubic polynomial fitted through Lagrange interpolation. Depending on
//! the configured [`ObsEncoding`], the agent observes either the plain
//! relative state or a compact polynomial encoding of the entire future
//! preceding-vehicle trajectory.
//!
//! The dynamics and reward are available both in raw-state space and in
//! observation space; the observation-space variant is differentiable,
//! including a sigmoid-gated blend across segment boundaries, so that an
//! external gradient-based learner can backpropagate through it.
//!
//! ```no_run
//! use ecodrive_core::{Env, Policy};
//! use ecodrive_env::{CarFollowEnv, CarFollowEnvConfig, RandomPolicy};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = CarFollowEnvConfig::default().data_path("traces.csv");
//! let mut env = CarFollowEnv::build(&config, 42)?;
//! let mut policy = RandomPolicy::new(env.limits().a_min, env.limits().a_max, 42);
//!
//! let mut obs = env.reset()?;
//! loop {
//!     let act = policy.sample(&obs);
//!     let (step, _record) = env.step(&act);
//!     if step.is_done() {
//!         break;
//!     }
//!     obs = step.obs;
//! }
//! # Ok(())
//! # }
//! ```
mod act;
mod dynamics;
mod env;
pub mod error;
mod obs;
mod poly;
mod segment;
mod trace;
mod window;

pub use act::{CarFollowAct, RandomPolicy, RandomPolicyConfig};
pub use dynamics::{Dynamics, Limits, RewardWeights, VehicleParams};
pub use env::{
    CarFollowEnv, CarFollowEnvConfig, EpisodeState, InitialState, ManualTrace, ResetOptions,
};
pub use obs::{CarFollowObs, Codec, ObsEncoding};
pub use poly::Poly;
pub use segment::{Segment, TrajectoryModel, LGL_NODES, SEGMENT_DURATION};
pub use trace::{CsvTraces, InMemoryTraces, TraceRepository, VehicleTrace};
pub use window::{ControlMode, SelectOptions, TraceWindow, WindowSelector};
