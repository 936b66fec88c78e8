//! Selection of a contiguous trace window for one episode.
use crate::error::EnvError;
use crate::trace::{TraceRepository, VehicleTrace};
use log::{debug, info};

/// Epsilon used when testing whether a sample time lies inside a window.
const TIME_EPS: f64 = 1e-7;

/// Offset added to the rebased time and distance series so that the
/// polynomial terms at the first step are non-degenerate.
const REBASE_OFFSET: f64 = 0.1;

/// Flags describing the selected window, recomputed on every selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlMode {
    /// The preceding vehicle is (nearly) standing still over the window;
    /// stop-and-go handling is required.
    pub stop_line: bool,

    /// The window reaches the end of the trace; the horizon cannot be
    /// extended any further.
    pub terminate: bool,
}

impl ecodrive_core::Info for ControlMode {}

/// A contiguous, rebased window of a preceding-vehicle trace.
///
/// Times and distances are shifted so the first sample sits at
/// `REBASE_OFFSET`; speeds are copied verbatim and accelerations are
/// forward differences with a trailing zero.
#[derive(Clone, Debug)]
pub struct TraceWindow {
    dt: f64,
    t: Vec<f64>,
    dp: Vec<f64>,
    vp: Vec<f64>,
    ap: Vec<f64>,
    vehicle_id: String,
    t_beg: f64,
    control: ControlMode,
}

impl TraceWindow {
    /// Sampling period.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Rebased sample times, starting at 0.1.
    pub fn t(&self) -> &[f64] {
        &self.t
    }

    /// Rebased preceding-vehicle positions, starting at 0.1.
    pub fn dp(&self) -> &[f64] {
        &self.dp
    }

    /// Preceding-vehicle speeds.
    pub fn vp(&self) -> &[f64] {
        &self.vp
    }

    /// Preceding-vehicle accelerations.
    pub fn ap(&self) -> &[f64] {
        &self.ap
    }

    /// Identifier of the vehicle the window was cut from.
    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    /// Start of the window in the original trace's time base.
    pub fn t_beg(&self) -> f64 {
        self.t_beg
    }

    /// The window's control-mode flags.
    pub fn control(&self) -> ControlMode {
        self.control
    }

    /// Number of simulation steps in the window (`samples - 1`).
    pub fn n_steps(&self) -> usize {
        self.t.len() - 1
    }

    /// First rebased sample time.
    pub fn t_first(&self) -> f64 {
        self.t[0]
    }

    /// Last rebased sample time.
    pub fn t_last(&self) -> f64 {
        self.t[self.t.len() - 1]
    }

    /// Linearly interpolates the position series at a fractional step
    /// index, clamped to the window.
    pub fn dp_at(&self, k: f64) -> f64 {
        interp_index(&self.dp, k)
    }

    /// Linearly interpolates the speed series at a fractional step index,
    /// clamped to the window.
    pub fn vp_at(&self, k: f64) -> f64 {
        interp_index(&self.vp, k)
    }
}

fn interp_index(series: &[f64], k: f64) -> f64 {
    let last = (series.len() - 1) as f64;
    let k = k.clamp(0.0, last);
    let i0 = k.floor() as usize;
    if i0 as f64 >= last {
        return series[series.len() - 1];
    }
    let frac = k - i0 as f64;
    series[i0] + frac * (series[i0 + 1] - series[i0])
}

/// Options controlling where a window is cut from.
#[derive(Clone, Copy, Default)]
pub struct SelectOptions<'a> {
    /// Cut from this vehicle instead of picking one at random.
    pub preceding_id: Option<&'a str>,

    /// Restrict the random choice to ids satisfying the predicate.
    pub data_filter: Option<&'a dyn Fn(&str) -> bool>,

    /// Window start as an offset in seconds from the trace start. When
    /// given, a low-speed window is accepted and flagged `stop_line`
    /// instead of resampled.
    pub t_beg: Option<f64>,

    /// Horizon in seconds, overriding the selector default.
    pub t_horizon: Option<f64>,
}

/// Cuts valid trace windows out of a repository, resampling rejected
/// candidates up to a bounded number of retries.
#[derive(Clone, Debug)]
pub struct WindowSelector {
    /// Default horizon in seconds.
    pub horizon: f64,

    /// Simulation timestep in seconds.
    pub dt: f64,

    /// Minimum average window speed below which a candidate is rejected.
    pub min_avg_speed: f64,

    /// Maximum number of rejected candidates before giving up.
    pub max_retries: usize,
}

impl Default for WindowSelector {
    fn default() -> Self {
        Self {
            horizon: 10.0,
            dt: 0.1,
            min_avg_speed: 2.0,
            max_retries: 1000,
        }
    }
}

impl WindowSelector {
    /// Selects a window from the repository according to the options.
    ///
    /// Candidates with the wrong sample count or too low an average speed
    /// are resampled; after `max_retries` rejections the selection fails
    /// with [`EnvError::NoValidWindow`].
    pub fn select(
        &self,
        repo: &dyn TraceRepository,
        opts: &SelectOptions,
        rng: &mut fastrand::Rng,
    ) -> Result<TraceWindow, EnvError> {
        let ids: Vec<String> = match opts.preceding_id {
            Some(id) => vec![id.to_string()],
            None => {
                let mut ids = repo.ids();
                if let Some(filter) = opts.data_filter {
                    ids.retain(|id| filter(id));
                }
                ids
            }
        };
        if ids.is_empty() {
            return Err(EnvError::EmptyDataset);
        }

        // With both the vehicle and the start time pinned every retry
        // would look at the same candidate.
        let deterministic = opts.preceding_id.is_some() && opts.t_beg.is_some();

        for attempt in 0..self.max_retries {
            let id = &ids[rng.usize(..ids.len())];
            let trace = repo.load(id)?;

            if let Some(window) = self.cut(&trace, id, opts, rng)? {
                if attempt > 0 {
                    debug!("selected window after {} rejected candidates", attempt);
                }
                return Ok(window);
            }
            if deterministic {
                return Err(EnvError::NoValidWindow { attempts: 1 });
            }
        }

        Err(EnvError::NoValidWindow {
            attempts: self.max_retries,
        })
    }

    /// Cuts a window from an explicitly supplied trace, bypassing the
    /// repository. Used for manually supplied preceding-vehicle data.
    pub fn select_from_trace(
        &self,
        trace: &VehicleTrace,
        id: &str,
        opts: &SelectOptions,
        rng: &mut fastrand::Rng,
    ) -> Result<TraceWindow, EnvError> {
        self.cut(trace, id, opts, rng)?
            .ok_or(EnvError::NoValidWindow { attempts: 1 })
    }

    /// Tries one candidate window; `Ok(None)` means the candidate was
    /// rejected and should be resampled.
    fn cut(
        &self,
        trace: &VehicleTrace,
        id: &str,
        opts: &SelectOptions,
        rng: &mut fastrand::Rng,
    ) -> Result<Option<TraceWindow>, EnvError> {
        let horizon = opts.t_horizon.unwrap_or(self.horizon);
        if (trace.dt() - self.dt).abs() > 1e-9 {
            return Err(EnvError::InvalidTrace(format!(
                "trace dt {} does not match environment dt {}",
                trace.dt(),
                self.dt
            )));
        }
        let usable = trace.t_end() - trace.t_begin();
        if usable < horizon {
            return Err(EnvError::HorizonTooLong {
                trace_len: usable,
                horizon,
            });
        }

        let latest = trace.t_end() - horizon;
        let t_beg_sel = match opts.t_beg {
            Some(offset) => trace.t_begin() + offset,
            // Whole-second starts, as in the recorded datasets.
            None => (trace.t_begin() + rng.f64() * (latest - trace.t_begin())).round(),
        };
        let t_beg = t_beg_sel.clamp(trace.t_begin(), latest);
        let t_end = t_beg + horizon;

        let time = trace.time();
        let first = time.partition_point(|&t| t < t_beg - TIME_EPS);
        let last = time.partition_point(|&t| t <= t_end + TIME_EPS);
        let idx = first..last;

        let expected = (horizon / self.dt).round() as usize + 1;
        if idx.len() != expected {
            // Short cycle, or the vehicle left and re-entered the lane.
            debug!(
                "rejecting window of {} on sample count {} != {}",
                id,
                idx.len(),
                expected
            );
            return Ok(None);
        }

        let t0 = time[first];
        let d0 = trace.distance()[first];
        let t: Vec<f64> = time[idx.clone()].iter().map(|&x| x - t0 + REBASE_OFFSET).collect();
        let dp: Vec<f64> = trace.distance()[idx.clone()]
            .iter()
            .map(|&x| x - d0 + REBASE_OFFSET)
            .collect();
        let vp: Vec<f64> = trace.speed()[idx].to_vec();
        let mut ap: Vec<f64> = vp.windows(2).map(|w| (w[1] - w[0]) / self.dt).collect();
        ap.push(0.0);

        let mut control = ControlMode::default();

        let vp_avg = vp.iter().sum::<f64>() / vp.len() as f64;
        if vp_avg < self.min_avg_speed {
            if opts.t_beg.is_none() {
                debug!(
                    "rejecting window of {} at t = {} on average speed {:.2}",
                    id, t_beg, vp_avg
                );
                return Ok(None);
            }
            // An explicitly placed window is kept; the preceding vehicle
            // is standing at a stop line.
            info!("window of {} at t = {} is stop-and-go", id, t_beg);
            control.stop_line = true;
        }

        if t_end >= trace.t_end() - self.dt - TIME_EPS {
            control.terminate = true;
        }

        Ok(Some(TraceWindow {
            dt: self.dt,
            t,
            dp,
            vp,
            ap,
            vehicle_id: id.to_string(),
            t_beg,
            control,
        }))
    }
}
