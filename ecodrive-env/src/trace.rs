//! Recorded preceding-vehicle traces and the repository they are loaded
//! from.
use crate::error::EnvError;
use log::info;
use std::collections::BTreeMap;
use std::path::Path;

/// One recorded vehicle trace: sampled time, travelled distance and
/// speed, with acceleration derived by finite differences.
///
/// Recording gaps (missing samples after a lane change or a short cycle)
/// are tolerated; windows spanning a gap come up short on samples and are
/// rejected during selection, not here.
///
/// A trace is immutable once constructed.
#[derive(Clone, Debug)]
pub struct VehicleTrace {
    dt: f64,
    time: Vec<f64>,
    distance: Vec<f64>,
    speed: Vec<f64>,
    accel: Vec<f64>,
}

impl VehicleTrace {
    /// Builds a trace from raw sample series.
    ///
    /// The series must have equal lengths of at least two samples and a
    /// strictly increasing time series. The nominal sampling period is
    /// the smallest observed spacing.
    pub fn new(time: Vec<f64>, distance: Vec<f64>, speed: Vec<f64>) -> Result<Self, EnvError> {
        if time.len() != distance.len() || time.len() != speed.len() {
            return Err(EnvError::InvalidTrace(format!(
                "series length mismatch: {} times, {} distances, {} speeds",
                time.len(),
                distance.len(),
                speed.len()
            )));
        }
        if time.len() < 2 {
            return Err(EnvError::InvalidTrace(format!(
                "need at least 2 samples, got {}",
                time.len()
            )));
        }

        let mut dt = f64::INFINITY;
        for w in time.windows(2) {
            let spacing = w[1] - w[0];
            if spacing <= 0.0 {
                return Err(EnvError::InvalidTrace(format!(
                    "non-increasing time series near t = {}",
                    w[0]
                )));
            }
            dt = dt.min(spacing);
        }

        // Forward difference with a trailing zero, matching the window
        // extraction convention. Per-interval spacing keeps the values
        // correct across recording gaps.
        let mut accel: Vec<f64> = time
            .windows(2)
            .zip(speed.windows(2))
            .map(|(t, v)| (v[1] - v[0]) / (t[1] - t[0]))
            .collect();
        accel.push(0.0);

        Ok(Self {
            dt,
            time,
            distance,
            speed,
            accel,
        })
    }

    /// Nominal sampling period, the smallest observed spacing.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Returns `true` if the trace has no samples. Construction guarantees
    /// this is never the case.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Sample times.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Travelled distances.
    pub fn distance(&self) -> &[f64] {
        &self.distance
    }

    /// Speeds.
    pub fn speed(&self) -> &[f64] {
        &self.speed
    }

    /// Derived accelerations.
    pub fn accel(&self) -> &[f64] {
        &self.accel
    }

    /// First sample time.
    pub fn t_begin(&self) -> f64 {
        self.time[0]
    }

    /// Last sample time.
    pub fn t_end(&self) -> f64 {
        self.time[self.time.len() - 1]
    }
}

/// A read-only repository of recorded vehicle traces.
///
/// The repository is injected into the trace selector; it replaces any
/// ambient dataset state, and can be shared across repeated resets.
pub trait TraceRepository {
    /// The vehicle identifiers available in the repository, sorted.
    fn ids(&self) -> Vec<String>;

    /// Loads the trace recorded for the given vehicle.
    fn load(&self, id: &str) -> Result<VehicleTrace, EnvError>;
}

/// An in-memory trace repository.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTraces {
    traces: BTreeMap<String, VehicleTrace>,
}

impl InMemoryTraces {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a trace under the given vehicle id.
    pub fn insert(&mut self, id: impl Into<String>, trace: VehicleTrace) {
        self.traces.insert(id.into(), trace);
    }

    /// Number of traces held.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Returns `true` if the repository holds no traces.
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

impl TraceRepository for InMemoryTraces {
    fn ids(&self) -> Vec<String> {
        self.traces.keys().cloned().collect()
    }

    fn load(&self, id: &str) -> Result<VehicleTrace, EnvError> {
        self.traces
            .get(id)
            .cloned()
            .ok_or_else(|| EnvError::UnknownVehicle(id.to_string()))
    }
}

/// A trace repository backed by a CSV file with `id,time,distance,speed`
/// rows. Rows belonging to one vehicle must appear in time order.
#[derive(Clone, Debug)]
pub struct CsvTraces {
    inner: InMemoryTraces,
}

impl CsvTraces {
    /// Reads all traces from the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EnvError> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let mut series: BTreeMap<String, (Vec<f64>, Vec<f64>, Vec<f64>)> = BTreeMap::new();

        for result in reader.records() {
            let row = result?;
            if row.len() < 4 {
                return Err(EnvError::InvalidTrace(format!(
                    "expected 4 columns (id,time,distance,speed), got {}",
                    row.len()
                )));
            }
            let id = row[0].to_string();
            let parse = |s: &str| -> Result<f64, EnvError> {
                s.trim()
                    .parse::<f64>()
                    .map_err(|_| EnvError::InvalidTrace(format!("bad numeric field: {:?}", s)))
            };
            let entry = series.entry(id).or_default();
            entry.0.push(parse(&row[1])?);
            entry.1.push(parse(&row[2])?);
            entry.2.push(parse(&row[3])?);
        }

        let mut inner = InMemoryTraces::new();
        for (id, (time, distance, speed)) in series {
            inner.insert(id, VehicleTrace::new(time, distance, speed)?);
        }
        info!("loaded {} traces from csv", inner.len());

        Ok(Self { inner })
    }

    /// Number of traces held.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the file contained no traces.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl TraceRepository for CsvTraces {
    fn ids(&self) -> Vec<String> {
        self.inner.ids()
    }

    fn load(&self, id: &str) -> Result<VehicleTrace, EnvError> {
        self.inner.load(id)
    }
}
