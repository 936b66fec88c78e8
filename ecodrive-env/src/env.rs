//! The car-following environment.
mod config;
pub use config::{CarFollowEnvConfig, InitialState, ManualTrace, ResetOptions};

use crate::act::CarFollowAct;
use crate::dynamics::Dynamics;
use crate::error::EnvError;
use crate::obs::{CarFollowObs, Codec};
use crate::segment::TrajectoryModel;
use crate::trace::{CsvTraces, TraceRepository};
use crate::window::{ControlMode, SelectOptions, TraceWindow, WindowSelector};
use anyhow::Result;
use ecodrive_core::record::{Record, RecordValue};
use ecodrive_core::{Env, Step};
use log::info;
use ndarray::{array, Array1, Array2, Axis};
use std::rc::Rc;

/// Tolerance on the terminal position check.
const GAP_TOL: f64 = 1.0;

/// Tolerance on the terminal speed check.
const SPEED_TOL: f64 = 1.0;

/// Offset behind the preceding vehicle's final position that defines the
/// episode's terminal ego position.
const FINAL_POSITION_OFFSET: f64 = 30.0;

/// The ego vehicle's kinematic state: absolute position and speed.
///
/// Replaced wholesale on every reset and step; never mutated in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpisodeState {
    /// Absolute position along the road.
    pub position: f64,

    /// Speed.
    pub speed: f64,
}

// Everything owned by one running episode.
struct Episode {
    model: Rc<TrajectoryModel>,
    state: EpisodeState,
    init: EpisodeState,
    obs: Array1<f64>,
    k: usize,
    position_target: f64,
    speed_target: f64,
    control: ControlMode,
}

/// A car-following longitudinal-control environment over recorded
/// preceding-vehicle traces.
///
/// One instance simulates one episode at a time; the trace repository is
/// read-only and shared across resets.
pub struct CarFollowEnv {
    codec: Codec,
    dynamics: Dynamics,
    selector: WindowSelector,
    repo: Option<Box<dyn TraceRepository>>,
    default_reset: ResetOptions,
    rng: fastrand::Rng,
    episode: Option<Episode>,
}

impl CarFollowEnv {
    /// Builds an environment over an explicit trace repository instead of
    /// a CSV dataset path.
    pub fn with_repository(
        config: &CarFollowEnvConfig,
        repo: Box<dyn TraceRepository>,
        seed: u64,
    ) -> Self {
        let mut env = Self::from_config(config, seed);
        env.repo = Some(repo);
        env
    }

    fn from_config(config: &CarFollowEnvConfig, seed: u64) -> Self {
        Self {
            codec: Codec {
                encoding: config.encoding,
            },
            dynamics: Dynamics {
                params: config.params,
                limits: config.limits,
                weights: config.weights,
                encoding: config.encoding,
            },
            selector: WindowSelector {
                horizon: config.horizon,
                dt: config.limits.dt,
                min_avg_speed: config.min_avg_speed,
                max_retries: config.max_retries,
            },
            repo: None,
            default_reset: config.reset.clone(),
            rng: fastrand::Rng::with_seed(seed),
            episode: None,
        }
    }

    /// Starts a new episode with explicit options, overriding the
    /// configured defaults.
    pub fn reset_with(&mut self, opts: &ResetOptions) -> Result<CarFollowObs> {
        // Keeping the preceding vehicle reuses the fitted model and the
        // drawn initial state, so the episode is exactly repeatable.
        let kept = if !opts.random_vehicle {
            self.episode
                .as_ref()
                .map(|ep| (Rc::clone(&ep.model), ep.init))
        } else {
            None
        };

        let (model, kept_init) = match kept {
            Some((model, init)) => (model, Some(init)),
            None => {
                let window = self.select_window(opts)?;
                (Rc::new(TrajectoryModel::fit(window)), None)
            }
        };

        let init = match (opts.initial_state, kept_init) {
            (Some(s), _) => EpisodeState {
                position: s.d0,
                speed: s.v0,
            },
            (None, Some(init)) => init,
            (None, None) => self.draw_initial(&model),
        };

        let window = model.window();
        let n = window.n_steps();
        let position_target = window.dp()[n] - FINAL_POSITION_OFFSET;
        let speed_target = window.vp()[n];
        let control = window.control();

        info!(
            "episode on {} from t = {} ({} segments, stop_line = {}, terminate = {})",
            window.vehicle_id(),
            window.t_beg(),
            model.n_segments(),
            control.stop_line,
            control.terminate,
        );

        let obs = self
            .codec
            .encode(&model, array![[init.position, init.speed]].view(), 0)
            .row(0)
            .to_owned();

        self.episode = Some(Episode {
            model,
            state: init,
            init,
            obs: obs.clone(),
            k: 0,
            position_target,
            speed_target,
            control,
        });

        Ok(CarFollowObs::single(obs))
    }

    /// Samples an action uniformly from `[a_min, a_max]`.
    pub fn sample_action(&mut self) -> CarFollowAct {
        let lim = self.dynamics.limits;
        CarFollowAct(lim.a_min + (lim.a_max - lim.a_min) * self.rng.f64())
    }

    /// The kinematic limits in effect.
    pub fn limits(&self) -> crate::dynamics::Limits {
        self.dynamics.limits
    }

    /// The dynamics and reward engine in effect.
    pub fn dynamics(&self) -> &Dynamics {
        &self.dynamics
    }

    /// The state/observation codec in effect.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// The running episode's trajectory model, if an episode is active.
    pub fn trajectory(&self) -> Option<&TrajectoryModel> {
        self.episode.as_ref().map(|ep| ep.model.as_ref())
    }

    /// The running episode's ego state, if an episode is active.
    pub fn state(&self) -> Option<EpisodeState> {
        self.episode.as_ref().map(|ep| ep.state)
    }

    /// The running episode's control-mode flags.
    pub fn control_mode(&self) -> Option<ControlMode> {
        self.episode.as_ref().map(|ep| ep.control)
    }

    /// The running episode's step index.
    pub fn current_step(&self) -> Option<usize> {
        self.episode.as_ref().map(|ep| ep.k)
    }

    /// Decodes observation rows into `[position, speed]` rows against the
    /// running episode's trace. For offline reconstruction and plotting.
    pub fn decode(&self, obs: &CarFollowObs) -> Option<Array2<f64>> {
        self.episode
            .as_ref()
            .map(|ep| self.codec.decode(&ep.model, obs.0.view()))
    }

    fn select_window(&mut self, opts: &ResetOptions) -> Result<TraceWindow, EnvError> {
        let filter = opts.data_filter.clone();
        let sel = SelectOptions {
            preceding_id: opts.preceding_id.as_deref(),
            data_filter: filter.as_ref().map(|f| f.as_ref() as &(dyn Fn(&str) -> bool)),
            t_beg: opts.t_beg,
            t_horizon: opts.t_horizon,
        };

        if let Some(manual) = &opts.manual_trace {
            let trace = manual.to_trace()?;
            self.selector
                .select_from_trace(&trace, &manual.id, &sel, &mut self.rng)
        } else if let Some(repo) = &self.repo {
            self.selector.select(repo.as_ref(), &sel, &mut self.rng)
        } else {
            Err(EnvError::EmptyDataset)
        }
    }

    // The initial gap is drawn inside the allowed distance band with a
    // margin; the initial speed near the preceding vehicle's.
    fn draw_initial(&mut self, model: &TrajectoryModel) -> EpisodeState {
        let lim = self.dynamics.limits;
        let window = model.window();
        let lo = lim.d_min + 5.0;
        let hi = lim.d_max - 5.0;
        let follow0 = lo + (hi - lo) * self.rng.f64();
        let vp0 = window.vp()[0];
        EpisodeState {
            position: window.dp()[0] - follow0,
            speed: (vp0 - 5.0 + 10.0 * self.rng.f64()).clamp(0.0, lim.v_max),
        }
    }
}

impl Env for CarFollowEnv {
    type Config = CarFollowEnvConfig;
    type Obs = CarFollowObs;
    type Act = CarFollowAct;
    type Info = ControlMode;

    fn build(config: &Self::Config, seed: u64) -> Result<Self> {
        let mut env = Self::from_config(config, seed);
        if let Some(path) = &config.data_path {
            env.repo = Some(Box::new(CsvTraces::open(path)?));
        }
        Ok(env)
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        let opts = self.default_reset.clone();
        self.reset_with(&opts)
    }

    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs> {
        self.rng = fastrand::Rng::with_seed(ix as u64);
        self.reset()
    }

    fn step(&mut self, act: &Self::Act) -> (Step<Self>, Record) {
        let dynamics = self.dynamics;
        let ep = self
            .episode
            .as_mut()
            .expect("reset() must be called before step()");
        let model = Rc::clone(&ep.model);
        let window = model.window();
        let n = window.n_steps();

        let gap = ep.obs[0];
        let v = ep.obs[1];
        let k = ep.obs[2].round() as usize;

        // Hard braking overrides the requested action below the safe
        // distance.
        let targets = dynamics.targets_for_row(&model, ep.obs.view());
        let a = dynamics.clip_unsafe_action(gap, targets.speed, act.0);
        let action = Array1::from_elem(1, a);

        let state = array![[ep.state.position, ep.state.speed]];
        let next_state = dynamics.next_state(state.view(), action.view());

        let obs2 = ep.obs.clone().insert_axis(Axis(0));
        let reward = dynamics.reward(&model, obs2.view(), action.view())[0];

        // The terminal check compares the position implied by the current
        // gap against the target behind the preceding vehicle's final
        // position.
        let implied_position = window.dp()[n] - gap;
        let terminated = (implied_position - ep.position_target).abs() <= GAP_TOL
            && (v - ep.speed_target).abs() <= SPEED_TOL
            && k == n;
        let truncated = v < dynamics.limits.v_min || k == n;

        let next_obs = dynamics.next_observation(&model, obs2.view(), action.view());

        ep.state = EpisodeState {
            position: next_state[[0, 0]],
            speed: next_state[[0, 1]],
        };
        ep.obs = next_obs.row(0).to_owned();
        ep.k += 1;

        let mut record = Record::empty();
        record.insert("gap", RecordValue::Scalar(gap as f32));
        record.insert("speed", RecordValue::Scalar(v as f32));
        record.insert("action", RecordValue::Scalar(a as f32));
        record.insert("reward", RecordValue::Scalar(reward as f32));

        let step = Step::new(
            CarFollowObs(next_obs),
            CarFollowAct(a),
            reward,
            terminated,
            truncated,
            ep.control,
        );
        (step, record)
    }
}
