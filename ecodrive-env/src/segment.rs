//! Piecewise cubic approximation of the preceding-vehicle trajectory.
//!
//! The trace window is partitioned into fixed-duration segments; inside
//! each segment the position profile is approximated by the unique cubic
//! through four Lagrange interpolation nodes. The fitted model is what the
//! polynomial observation encoding exposes to the agent.
use crate::poly::Poly;
use crate::window::TraceWindow;
use itertools::Itertools;

/// Duration of one segment in seconds.
pub const SEGMENT_DURATION: f64 = 5.0;

/// Canonical interpolation node positions on `[-1, 1]`, a
/// Legendre-Gauss-Lobatto-like set for the cubic fit.
pub const LGL_NODES: [f64; 4] = [-1.0, -0.4472135954999579, 0.4472135954999579, 1.0];

/// One fixed-duration interval of the window with its fitted cubic.
#[derive(Clone, Debug)]
pub struct Segment {
    begin: f64,
    end: f64,
    node_times: [f64; 4],
    node_values: [f64; 4],
    poly: Poly,
    bases: Vec<Poly>,
}

impl Segment {
    /// Start of the segment's time span.
    pub fn begin(&self) -> f64 {
        self.begin
    }

    /// End of the segment's time span.
    pub fn end(&self) -> f64 {
        self.end
    }

    /// The node times the cubic was fitted at.
    pub fn node_times(&self) -> &[f64; 4] {
        &self.node_times
    }

    /// The sampled distances at the node times.
    pub fn node_values(&self) -> &[f64; 4] {
        &self.node_values
    }

    /// The fitted cubic, coefficients lowest order first.
    pub fn poly(&self) -> &Poly {
        &self.poly
    }

    /// The Lagrange basis polynomials used for the fit.
    pub fn bases(&self) -> &[Poly] {
        &self.bases
    }

    /// The four cubic coefficients `[c0, c1, c2, c3]`.
    pub fn coeffs(&self) -> [f64; 4] {
        [
            self.poly.coeff(0),
            self.poly.coeff(1),
            self.poly.coeff(2),
            self.poly.coeff(3),
        ]
    }

    /// Evaluates the fitted cubic at time `t`.
    pub fn eval(&self, t: f64) -> f64 {
        self.poly.eval(t)
    }
}

/// The per-episode trajectory model: the selected window plus the fitted
/// segment list. Owned by one running episode.
#[derive(Clone, Debug)]
pub struct TrajectoryModel {
    window: TraceWindow,
    segments: Vec<Segment>,
    steps_per_segment: usize,
}

impl TrajectoryModel {
    /// Fits the piecewise cubic model to a trace window.
    pub fn fit(window: TraceWindow) -> Self {
        let t0 = window.t_first();
        let t_end = window.t_last();
        let dt = window.dt();

        // Segment starts below `t_end - 1` paired with ends below
        // `t_end + 1`; for the default 10 s horizon this yields exactly
        // two 5 s segments.
        let n_starts = ((t_end - 1.0 - t0) / SEGMENT_DURATION).ceil().max(1.0) as usize;
        let n_ends = ((t_end + 1.0 - (t0 + SEGMENT_DURATION)) / SEGMENT_DURATION)
            .ceil()
            .max(1.0) as usize;
        let n_segments = n_starts.min(n_ends);

        let segments = (0..n_segments)
            .map(|i| {
                let begin = t0 + i as f64 * SEGMENT_DURATION;
                let end = begin + SEGMENT_DURATION;
                Self::fit_segment(&window, begin, end)
            })
            .collect();

        Self {
            window,
            segments,
            steps_per_segment: (SEGMENT_DURATION / dt).round() as usize,
        }
    }

    fn fit_segment(window: &TraceWindow, begin: f64, end: f64) -> Segment {
        let mut node_times = [0.0; 4];
        let mut node_values = [0.0; 4];
        for (i, &tau) in LGL_NODES.iter().enumerate() {
            let tl = ((1.0 - tau) * begin + (1.0 + tau) * end) / 2.0;
            node_times[i] = tl;
            node_values[i] = Self::interp_dp(window, tl);
        }

        let (poly, bases) = Poly::lagrange_fit(&node_times, &node_values);
        Segment {
            begin,
            end,
            node_times,
            node_values,
            poly,
            bases,
        }
    }

    // Linear interpolation of the window's position series; a node that
    // falls outside the window by a floating-point hair clamps to the
    // boundary sample.
    fn interp_dp(window: &TraceWindow, tl: f64) -> f64 {
        let idx = (tl - window.t_first()) / window.dt();
        window.dp_at(idx)
    }

    /// The trace window the model was fitted to.
    pub fn window(&self) -> &TraceWindow {
        &self.window
    }

    /// The fitted segments, in time order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn n_segments(&self) -> usize {
        self.segments.len()
    }

    /// Number of simulation steps covered by one segment.
    pub fn steps_per_segment(&self) -> usize {
        self.steps_per_segment
    }

    /// Index of the segment owning step `k`, clamped to the last segment.
    pub fn segment_index(&self, k: usize) -> usize {
        (k / self.steps_per_segment).min(self.segments.len() - 1)
    }

    /// The segment owning step `k`, clamped to the last segment.
    pub fn segment_for_step(&self, k: usize) -> &Segment {
        &self.segments[self.segment_index(k)]
    }

    /// The final segment, which terminal targets are derived from.
    pub fn last_segment(&self) -> &Segment {
        &self.segments[self.segments.len() - 1]
    }

    /// Largest continuity gap between adjacent segments at their shared
    /// endpoints. Diagnostic for model quality.
    pub fn max_joint_gap(&self) -> f64 {
        self.segments
            .iter()
            .tuple_windows()
            .map(|(a, b)| (a.eval(a.end()) - b.eval(b.begin())).abs())
            .fold(0.0, f64::max)
    }
}
