//! Observation encodings and the state/observation codec.
//!
//! The agent never sees the raw kinematic state directly; it sees one of
//! three encodings. The polynomial encoding additionally exposes a
//! flattened, time-scaled form of every segment's cubic coefficients so
//! the agent can "see" the entire future preceding-vehicle trajectory at
//! every step.
use crate::segment::TrajectoryModel;
use ecodrive_core::Obs;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Number of per-segment slots in the polynomial encoding tail.
pub(crate) const SEGMENT_SLOTS: usize = 4;

/// The observation encoding exposed to the agent.
///
/// Dispatch on the encoding happens once at construction; every encoding
/// implements the same codec and dynamics interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObsEncoding {
    /// `[gap, speed, step]`.
    Relative,

    /// `[gap, speed, step, preceding speed - speed]`.
    RelativeSpeedDelta,

    /// `[predicted gap, speed, step]` followed by four slots per segment:
    /// `{c3 t^3, c2 t^2, c1 t, c1 t + c0}` evaluated at the next step's
    /// time `t = dt (k + 1)`.
    Polynomial,
}

impl ObsEncoding {
    /// Observation vector length for a model with `n_segments` segments.
    pub fn obs_len(&self, n_segments: usize) -> usize {
        match self {
            ObsEncoding::Relative => 3,
            ObsEncoding::RelativeSpeedDelta => 4,
            ObsEncoding::Polynomial => 3 + n_segments * SEGMENT_SLOTS,
        }
    }
}

/// Observation rows produced by the environment.
///
/// A single interaction step carries one row; batched dynamics evaluation
/// may carry many.
#[derive(Clone, Debug)]
pub struct CarFollowObs(pub Array2<f64>);

impl Obs for CarFollowObs {
    fn len(&self) -> usize {
        self.0.nrows()
    }
}

impl CarFollowObs {
    /// Wraps a single observation row.
    pub fn single(row: Array1<f64>) -> Self {
        Self(row.insert_axis(Axis(0)))
    }

    /// The first (usually only) row.
    pub fn row(&self) -> ArrayView1<'_, f64> {
        self.0.row(0)
    }
}

/// Bidirectional (partially invertible) mapping between kinematic state
/// rows `[position, speed]` and observation rows.
#[derive(Clone, Copy, Debug)]
pub struct Codec {
    /// The encoding this codec produces.
    pub encoding: ObsEncoding,
}

impl Codec {
    /// Encodes state rows into observation rows at step `k`.
    ///
    /// The step index is clamped to the window's last step before trace
    /// indexing; the polynomial encoding evaluates the owning segment at
    /// the next step's time.
    pub fn encode(&self, model: &TrajectoryModel, state: ArrayView2<f64>, k: usize) -> Array2<f64> {
        let window = model.window();
        let n = window.n_steps();
        let k_clip = k.min(n);
        let dp_k = window.dp()[k_clip];
        let vp_k = window.vp()[k_clip];

        let rows = state.nrows();
        let mut obs = Array2::zeros((rows, self.encoding.obs_len(model.n_segments())));

        for r in 0..rows {
            let d = state[[r, 0]];
            let v = state[[r, 1]];
            obs[[r, 1]] = v;
            obs[[r, 2]] = k as f64;

            match self.encoding {
                ObsEncoding::Relative => {
                    obs[[r, 0]] = dp_k - d;
                }
                ObsEncoding::RelativeSpeedDelta => {
                    obs[[r, 0]] = dp_k - d;
                    obs[[r, 3]] = vp_k - v;
                }
                ObsEncoding::Polynomial => {
                    let t_next = window.dt() * (k + 1) as f64;
                    obs[[r, 0]] = model.segment_for_step(k).eval(t_next) - d;

                    for (i, segment) in model.segments().iter().enumerate() {
                        let c = segment.coeffs();
                        let base = 3 + i * SEGMENT_SLOTS;
                        obs[[r, base]] = c[3] * t_next.powi(3);
                        obs[[r, base + 1]] = c[2] * t_next.powi(2);
                        obs[[r, base + 2]] = c[1] * t_next;
                        obs[[r, base + 3]] = obs[[r, base + 2]] + c[0];
                    }
                }
            }
        }

        obs
    }

    /// Decodes observation rows back into `[position, speed]` rows, using
    /// the model's own preceding-vehicle positions at each row's step
    /// index.
    ///
    /// Used for offline trajectory reconstruction, not during simulation.
    pub fn decode(&self, model: &TrajectoryModel, obs: ArrayView2<f64>) -> Array2<f64> {
        let window = model.window();
        let n = window.n_steps();
        let dp: Vec<f64> = obs
            .rows()
            .into_iter()
            .map(|row| {
                let k = (row[2].round().max(0.0) as usize).min(n);
                window.dp()[k]
            })
            .collect();
        self.decode_with_preceding(obs, &dp)
    }

    /// Decodes observation rows against externally supplied
    /// preceding-vehicle positions, one per row.
    pub fn decode_with_preceding(&self, obs: ArrayView2<f64>, dp: &[f64]) -> Array2<f64> {
        debug_assert_eq!(obs.nrows(), dp.len());
        let mut state = Array2::zeros((obs.nrows(), 2));
        for (r, row) in obs.rows().into_iter().enumerate() {
            state[[r, 0]] = dp[r] - row[0];
            state[[r, 1]] = row[1];
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::VehicleTrace;
    use crate::window::{SelectOptions, WindowSelector};
    use ndarray::array;

    fn model(v: f64) -> TrajectoryModel {
        let n = 101;
        let time: Vec<f64> = (0..n).map(|i| i as f64 * 0.1).collect();
        let distance: Vec<f64> = time.iter().map(|t| v * t).collect();
        let trace = VehicleTrace::new(time, distance, vec![v; n]).unwrap();
        let opts = SelectOptions {
            preceding_id: Some("veh_1"),
            t_beg: Some(0.0),
            ..Default::default()
        };
        let mut rng = fastrand::Rng::with_seed(0);
        let window = WindowSelector::default()
            .select_from_trace(&trace, "veh_1", &opts, &mut rng)
            .unwrap();
        TrajectoryModel::fit(window)
    }

    #[test]
    fn observation_lengths() {
        let model = model(15.0);
        assert_eq!(ObsEncoding::Relative.obs_len(model.n_segments()), 3);
        assert_eq!(ObsEncoding::RelativeSpeedDelta.obs_len(model.n_segments()), 4);
        // 3 + 2 * (3 + 1) for the two-segment default horizon
        assert_eq!(ObsEncoding::Polynomial.obs_len(model.n_segments()), 11);
    }

    #[test]
    fn relative_round_trip_is_exact() {
        let model = model(15.0);
        let codec = Codec {
            encoding: ObsEncoding::Relative,
        };

        let state = array![[30.0, 12.5], [-4.0, 0.0], [55.5, 25.0]];
        for k in [0usize, 17, 50, 100, 120] {
            let obs = codec.encode(&model, state.view(), k);
            let decoded = codec.decode(&model, obs.view());
            for (a, b) in decoded.iter().zip(state.iter()) {
                assert!((a - b).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn polynomial_tail_layout() {
        let model = model(15.0);
        let codec = Codec {
            encoding: ObsEncoding::Polynomial,
        };
        let k = 10usize;
        let t_next = 0.1 * (k + 1) as f64;

        let obs = codec.encode(&model, array![[20.0, 15.0]].view(), k);
        assert_eq!(obs.ncols(), 11);

        for (i, segment) in model.segments().iter().enumerate() {
            let c = segment.coeffs();
            let base = 3 + i * SEGMENT_SLOTS;
            assert!((obs[[0, base]] - c[3] * t_next.powi(3)).abs() < 1e-9);
            assert!((obs[[0, base + 1]] - c[2] * t_next.powi(2)).abs() < 1e-9);
            assert!((obs[[0, base + 2]] - c[1] * t_next).abs() < 1e-9);
            // the cumulative slot differs from the linear slot by c0
            assert!((obs[[0, base + 3]] - obs[[0, base + 2]] - c[0]).abs() < 1e-9);
            // the three independent slots plus the cumulative one sum to
            // the cubic's value at the next step's time
            let value = obs[[0, base]] + obs[[0, base + 1]] + obs[[0, base + 3]];
            assert!((value - segment.eval(t_next)).abs() < 1e-9);
        }
    }

    #[test]
    fn polynomial_gap_uses_predicted_next_position() {
        let model = model(15.0);
        let codec = Codec {
            encoding: ObsEncoding::Polynomial,
        };
        let k = 25usize;
        let obs = codec.encode(&model, array![[40.0, 15.0]].view(), k);

        let t_next = 0.1 * (k + 1) as f64;
        let predicted = model.segment_for_step(k).eval(t_next);
        assert!((obs[[0, 0]] - (predicted - 40.0)).abs() < 1e-9);
    }

    #[test]
    fn step_index_is_clamped_when_encoding() {
        let model = model(15.0);
        let codec = Codec {
            encoding: ObsEncoding::Relative,
        };
        let state = array![[10.0, 5.0]];
        let beyond = codec.encode(&model, state.view(), 200);
        let last = codec.encode(&model, state.view(), 100);
        // gap indexed the final sample in both cases
        assert!((beyond[[0, 0]] - last[[0, 0]]).abs() < 1e-9);
    }
}
