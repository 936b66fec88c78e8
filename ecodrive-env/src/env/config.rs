//! Environment configuration and reset options.
use crate::dynamics::{Limits, RewardWeights, VehicleParams};
use crate::error::EnvError;
use crate::obs::ObsEncoding;
use crate::trace::VehicleTrace;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration of [`CarFollowEnv`](super::CarFollowEnv).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CarFollowEnvConfig {
    /// CSV trace dataset consumed at construction; `None` means episodes
    /// must supply manual preceding-vehicle data.
    pub data_path: Option<PathBuf>,

    /// Observation encoding, fixed at construction.
    pub encoding: ObsEncoding,

    /// Default horizon in seconds.
    pub horizon: f64,

    /// Minimum average window speed accepted during trace selection.
    pub min_avg_speed: f64,

    /// Retry budget for trace-window selection.
    pub max_retries: usize,

    /// Vehicle power-model parameters.
    pub params: VehicleParams,

    /// Kinematic limits and constraints.
    pub limits: Limits,

    /// Objective weights.
    pub weights: RewardWeights,

    /// Options applied by [`Env::reset`](ecodrive_core::Env::reset).
    pub reset: ResetOptions,
}

impl Default for CarFollowEnvConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            encoding: ObsEncoding::Polynomial,
            horizon: 10.0,
            min_avg_speed: 2.0,
            max_retries: 1000,
            params: VehicleParams::default(),
            limits: Limits::default(),
            weights: RewardWeights::default(),
            reset: ResetOptions::default(),
        }
    }
}

impl CarFollowEnvConfig {
    /// Sets the trace dataset path.
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// Sets the observation encoding.
    pub fn encoding(mut self, encoding: ObsEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the default horizon in seconds.
    pub fn horizon(mut self, horizon: f64) -> Self {
        self.horizon = horizon;
        self
    }

    /// Sets the default reset options.
    pub fn reset_options(mut self, reset: ResetOptions) -> Self {
        self.reset = reset;
        self
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let rdr = std::io::BufReader::new(file);
        Ok(serde_yaml::from_reader(rdr)?)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_yaml::to_writer(file, self)?;
        Ok(())
    }
}

/// Manual override for the initial ego state.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct InitialState {
    /// Initial ego position.
    pub d0: f64,

    /// Initial ego speed.
    pub v0: f64,
}

/// Fully externally supplied preceding-vehicle data, bypassing the
/// dataset lookup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManualTrace {
    /// Identifier to report for the vehicle.
    pub id: String,

    /// Sample times.
    pub time: Vec<f64>,

    /// Travelled distances.
    pub distance: Vec<f64>,

    /// Speeds.
    pub speed: Vec<f64>,
}

impl ManualTrace {
    /// Validates the supplied series; malformed data is a fatal
    /// configuration error.
    pub fn to_trace(&self) -> Result<VehicleTrace, EnvError> {
        VehicleTrace::new(self.time.clone(), self.distance.clone(), self.speed.clone())
    }
}

/// Trace-sampling and initialization options recognized by `reset`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ResetOptions {
    /// When `false`, resets after the first keep the previously selected
    /// preceding vehicle, window and initial state.
    pub random_vehicle: bool,

    /// Cut the window from this vehicle instead of a random one.
    pub preceding_id: Option<String>,

    /// Window start as an offset in seconds from the trace start.
    pub t_beg: Option<f64>,

    /// Horizon override in seconds.
    pub t_horizon: Option<f64>,

    /// Manual override for the initial ego state.
    pub initial_state: Option<InitialState>,

    /// Externally supplied preceding-vehicle data.
    pub manual_trace: Option<ManualTrace>,

    /// Restrict the random vehicle choice to ids satisfying the
    /// predicate. Not serialized.
    #[serde(skip)]
    pub data_filter: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl Default for ResetOptions {
    fn default() -> Self {
        Self {
            random_vehicle: true,
            preceding_id: None,
            t_beg: None,
            t_horizon: None,
            initial_state: None,
            manual_trace: None,
            data_filter: None,
        }
    }
}

impl fmt::Debug for ResetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetOptions")
            .field("random_vehicle", &self.random_vehicle)
            .field("preceding_id", &self.preceding_id)
            .field("t_beg", &self.t_beg)
            .field("t_horizon", &self.t_horizon)
            .field("initial_state", &self.initial_state)
            .field("manual_trace", &self.manual_trace.as_ref().map(|m| &m.id))
            .field("data_filter", &self.data_filter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
