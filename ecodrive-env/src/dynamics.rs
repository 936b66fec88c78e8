//! Forward dynamics and reward, in raw-state and observation space.
//!
//! Both projections advance the same transition
//! `(state_t, action_t) -> state_{t+1}` and must agree through the codec.
//! The observation-space variant is written so that every operation is
//! differentiable in the observation and action: the switch between
//! adjacent segment polynomials is a sigmoid-gated blend rather than a
//! branch, which keeps the function usable for gradient propagation by an
//! external learner.
use crate::obs::{ObsEncoding, SEGMENT_SLOTS};
use crate::segment::TrajectoryModel;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Steepness of the sigmoid gates blending adjacent segment polynomials.
const BLEND_STEEPNESS: f64 = 20.0;

/// Steepness of the sigmoid gates on the soft distance constraints.
const CONSTRAINT_STEEPNESS: f64 = 10.0;

/// Upper clip on the traction power term in the fuel proxy.
const POWER_CLIP: f64 = 1e6;

/// Longitudinal vehicle parameters for the fuel-proxy power model
/// `p1 v + p2 v^3 + p3 v a`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct VehicleParams {
    /// Vehicle mass in kg.
    pub mass: f64,

    /// Gravitational acceleration.
    pub gravity: f64,

    /// Rolling resistance coefficient.
    pub rolling_resistance: f64,

    /// Road grade in radians.
    pub road_grade: f64,

    /// Aerodynamic drag coefficient.
    pub drag: f64,
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            mass: 2000.0,
            gravity: 9.81,
            rolling_resistance: 0.01,
            road_grade: 0.0,
            drag: 0.3606,
        }
    }
}

impl VehicleParams {
    /// Coefficient of the speed-linear power term.
    pub fn p1(&self) -> f64 {
        self.rolling_resistance * self.mass * self.gravity * self.road_grade.cos()
            + self.mass * self.gravity * self.road_grade.sin()
    }

    /// Coefficient of the cubic (drag) power term.
    pub fn p2(&self) -> f64 {
        self.drag
    }

    /// Coefficient of the inertial power term.
    pub fn p3(&self) -> f64 {
        self.mass
    }
}

/// Kinematic limits and distance constraints.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum allowed following distance.
    pub d_max: f64,

    /// Nominal minimum following distance.
    pub d_min: f64,

    /// Standstill gap in the speed-dependent minimum distance.
    pub d_stop: f64,

    /// Headway factor in the speed-dependent minimum distance.
    pub headway: f64,

    /// Minimum speed.
    pub v_min: f64,

    /// Maximum speed.
    pub v_max: f64,

    /// Minimum acceleration.
    pub a_min: f64,

    /// Maximum acceleration.
    pub a_max: f64,

    /// Simulation timestep in seconds.
    pub dt: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            d_max: 80.0,
            d_min: 10.0,
            d_stop: 1.0,
            headway: 0.5,
            v_min: 0.0,
            v_max: 25.0,
            a_min: -3.0,
            a_max: 3.0,
            dt: 0.1,
        }
    }
}

impl Limits {
    /// The speed-dependent minimum safe following distance
    /// `d_stop + headway * v`.
    pub fn min_gap(&self, v: f64) -> f64 {
        self.d_stop + self.headway * v
    }
}

/// Objective weights: fuel-proxy term and control-effort term.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RewardWeights {
    /// Weight on the fuel-proxy (distance per energy) term.
    pub w1: f64,

    /// Weight on the squared-action control effort.
    pub w2: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self { w1: 1e-4, w2: 1.0 }
    }
}

/// Desired terminal gap and speed, derived from the final segment's
/// polynomial extrapolated one step beyond the window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerminalTargets {
    /// Desired terminal following distance.
    pub gap: f64,

    /// Desired terminal speed.
    pub speed: f64,
}

fn sigmoid(x: f64, steepness: f64) -> f64 {
    1.0 / (1.0 + (-steepness * x).exp())
}

fn relu(x: f64) -> f64 {
    x.max(0.0)
}

/// The dynamics and reward engine for one observation encoding.
#[derive(Clone, Copy, Debug)]
pub struct Dynamics {
    /// Vehicle power-model parameters.
    pub params: VehicleParams,

    /// Kinematic limits and constraints.
    pub limits: Limits,

    /// Objective weights.
    pub weights: RewardWeights,

    /// The observation encoding the engine operates in.
    pub encoding: ObsEncoding,
}

impl Dynamics {
    /// Advances raw `[position, speed]` rows one step.
    pub fn next_state(&self, state: ArrayView2<f64>, action: ArrayView1<f64>) -> Array2<f64> {
        let dt = self.limits.dt;
        let mut next = Array2::zeros(state.raw_dim());
        for r in 0..state.nrows() {
            let d = state[[r, 0]];
            let v = state[[r, 1]];
            let a = action[r];
            next[[r, 0]] = d + dt * v;
            next[[r, 1]] = (v + dt * a).clamp(self.limits.v_min, self.limits.v_max);
        }
        next
    }

    /// Advances observation rows one step in observation space.
    ///
    /// In the polynomial encoding this shifts every coefficient slot from
    /// its representation at step `k + 1` to `k + 2` and recomputes the
    /// predicted preceding-vehicle position through the sigmoid-gated
    /// segment blend, so the whole map stays differentiable.
    pub fn next_observation(
        &self,
        model: &TrajectoryModel,
        obs: ArrayView2<f64>,
        action: ArrayView1<f64>,
    ) -> Array2<f64> {
        let dt = self.limits.dt;
        let window = model.window();
        let mut next = Array2::zeros(obs.raw_dim());

        for (r, row) in obs.rows().into_iter().enumerate() {
            let gap = row[0];
            let v = row[1];
            let k = row[2];
            let a = action[r];
            let v_next = (v + dt * a).clamp(self.limits.v_min, self.limits.v_max);

            next[[r, 1]] = v_next;
            next[[r, 2]] = k + 1.0;

            match self.encoding {
                ObsEncoding::Relative => {
                    let dp_delta = window.dp_at(k + 1.0) - window.dp_at(k);
                    next[[r, 0]] = dp_delta + gap - dt * v;
                }
                ObsEncoding::RelativeSpeedDelta => {
                    let dp_delta = window.dp_at(k + 1.0) - window.dp_at(k);
                    next[[r, 0]] = dp_delta + gap - dt * v;
                    next[[r, 3]] = window.vp_at(k + 1.0) - v_next;
                }
                ObsEncoding::Polynomial => {
                    let dp_old = self.blended_position(model, row, k);

                    // Shift each slot from its value at t = dt (k + 1) to
                    // t = dt (k + 2); the cumulative slot picks up the
                    // linear slot's increment.
                    let ratio = (k + 2.0) / (k + 1.0);
                    for i in 0..model.n_segments() {
                        let base = 3 + i * SEGMENT_SLOTS;
                        next[[r, base]] = row[base] * ratio.powi(3);
                        next[[r, base + 1]] = row[base + 1] * ratio.powi(2);
                        next[[r, base + 2]] = row[base + 2] * ratio;
                        next[[r, base + 3]] = row[base + 3] + row[base + 2] * (ratio - 1.0);
                    }

                    let dp_new = self.blended_position(model, next.row(r), k + 1.0);
                    next[[r, 0]] = (dp_new - dp_old) + gap - dt * v;
                }
            }
        }

        next
    }

    // Predicted preceding-vehicle position encoded in an observation row's
    // coefficient slots, blended across segments with sigmoid gates
    // centered on the segment-boundary step indices.
    fn blended_position(&self, model: &TrajectoryModel, row: ArrayView1<f64>, k: f64) -> f64 {
        let n_seg = model.n_segments();
        let sps = model.steps_per_segment() as f64;
        let mut dp = 0.0;
        for i in 0..n_seg {
            let base = 3 + i * SEGMENT_SLOTS;
            let value = row[base] + row[base + 1] + row[base + 3];
            let lower = sigmoid(k + 0.5 - i as f64 * sps, BLEND_STEEPNESS);
            let weight = if i + 1 < n_seg {
                lower - sigmoid(k + 0.5 - (i + 1) as f64 * sps, BLEND_STEEPNESS)
            } else {
                lower
            };
            dp += value * weight;
        }
        dp
    }

    /// Terminal targets derived from the final segment's polynomial at
    /// step `k`.
    pub fn terminal_targets(&self, model: &TrajectoryModel, k: f64) -> TerminalTargets {
        let dt = self.limits.dt;
        let poly = model.last_segment().poly();
        let dp_n = poly.eval(dt * (k + 1.0));
        let dp_n1 = poly.eval(dt * k);
        Self::targets_from_positions(dp_n, dp_n1, dt)
    }

    /// Terminal targets recovered from a polynomial-encoded observation
    /// row's final-segment slots, without touching the model.
    pub fn terminal_targets_from_obs(
        &self,
        model: &TrajectoryModel,
        row: ArrayView1<f64>,
    ) -> TerminalTargets {
        let dt = self.limits.dt;
        let k = row[2];
        let base = 3 + (model.n_segments() - 1) * SEGMENT_SLOTS;
        let (s0, s1, s2, s3) = (row[base], row[base + 1], row[base + 2], row[base + 3]);

        // The slots hold the cubic's terms at t = dt (k + 1); rescaling
        // the powers recovers the value one step earlier.
        let ratio = k / (k + 1.0);
        let dp_n = s0 + s1 + s3;
        let dp_n1 = s0 * ratio.powi(3) + s1 * ratio.powi(2) + (s3 - s2 / (k + 1.0));
        Self::targets_from_positions(dp_n, dp_n1, dt)
    }

    fn targets_from_positions(dp_n: f64, dp_n1: f64, dt: f64) -> TerminalTargets {
        let speed = (dp_n - dp_n1) / dt;
        TerminalTargets {
            gap: 1.0 + 2.5 * speed,
            speed,
        }
    }

    /// Terminal targets for an observation row under the engine's
    /// encoding.
    pub fn targets_for_row(&self, model: &TrajectoryModel, row: ArrayView1<f64>) -> TerminalTargets {
        match self.encoding {
            ObsEncoding::Polynomial => self.terminal_targets_from_obs(model, row),
            _ => self.terminal_targets(model, row[2]),
        }
    }

    /// Forces a hard-braking action when the gap is below the
    /// speed-dependent minimum safe distance, bounded by the global
    /// minimum deceleration.
    pub fn clip_unsafe_action(&self, gap: f64, target_speed: f64, action: f64) -> f64 {
        let d_min = self.limits.min_gap(target_speed);
        if gap < d_min {
            (-0.5 * (d_min - gap)).max(self.limits.a_min)
        } else {
            action
        }
    }

    /// Reward of observation rows under the applied actions.
    pub fn reward(
        &self,
        model: &TrajectoryModel,
        obs: ArrayView2<f64>,
        action: ArrayView1<f64>,
    ) -> Array1<f64> {
        let n = model.window().n_steps() as f64;
        let mut out = Array1::zeros(obs.nrows());
        for (r, row) in obs.rows().into_iter().enumerate() {
            let targets = self.targets_for_row(model, row);
            out[r] = self.reward_terms(row[0], row[1], row[2], action[r], n, targets);
        }
        out
    }

    /// Reward of raw state rows under the applied actions.
    ///
    /// Distance constraints cannot bind without a gap, so the gap is
    /// taken at the midpoint of the allowed band and the step index at
    /// zero, as in the observation-free projection of the objective.
    pub fn reward_from_state(
        &self,
        model: &TrajectoryModel,
        state: ArrayView2<f64>,
        action: ArrayView1<f64>,
    ) -> Array1<f64> {
        let n = model.window().n_steps() as f64;
        let gap = (self.limits.d_min + self.limits.d_max) / 2.0;
        let targets = self.terminal_targets(model, 0.0);
        let mut out = Array1::zeros(state.nrows());
        for r in 0..state.nrows() {
            out[r] = self.reward_terms(gap, state[[r, 1]], 0.0, action[r], n, targets);
        }
        out
    }

    fn reward_terms(
        &self,
        gap: f64,
        v: f64,
        k: f64,
        a: f64,
        n: f64,
        targets: TerminalTargets,
    ) -> f64 {
        let (p1, p2, p3) = (self.params.p1(), self.params.p2(), self.params.p3());
        let (w1, w2) = (self.weights.w1, self.weights.w2);

        let power = (p1 * v + p2 * v.powi(3) + p3 * v * a).clamp(0.0, POWER_CLIP);
        let mut cost = -v * w1 / (power + 500.0) + w2 * a * a;

        let d_lb = self.limits.min_gap(targets.speed);
        cost += sigmoid(gap - self.limits.d_max, CONSTRAINT_STEEPNESS)
            * (gap - self.limits.d_max).powi(2);
        cost += sigmoid(d_lb - gap, CONSTRAINT_STEEPNESS) * (gap - d_lb).powi(2);
        cost += relu(k - n + 1.0)
            * (0.5 * (gap - targets.gap).powi(2) + 100.0 * (v - targets.speed));

        -cost / 100.0
    }
}
