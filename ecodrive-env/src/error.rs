//! Errors in the environment crate.
use thiserror::Error;

/// Errors raised while selecting traces and building episodes.
#[derive(Error, Debug)]
pub enum EnvError {
    /// The dataset contains no vehicles (after filtering).
    #[error("trace dataset is empty")]
    EmptyDataset,

    /// The requested vehicle id does not exist in the repository.
    #[error("unknown vehicle id: {0}")]
    UnknownVehicle(String),

    /// The trace data is malformed (non-uniform spacing, length mismatch,
    /// too few samples).
    #[error("invalid trace data: {0}")]
    InvalidTrace(String),

    /// No window satisfying the validity filter was found within the retry
    /// budget.
    #[error("no valid trace window found after {attempts} attempts")]
    NoValidWindow {
        /// Number of candidate windows that were rejected.
        attempts: usize,
    },

    /// The trace is shorter than the requested horizon.
    #[error("trace of {trace_len} s is shorter than the requested horizon of {horizon} s")]
    HorizonTooLong {
        /// Usable duration of the trace in seconds.
        trace_len: f64,
        /// Requested horizon in seconds.
        horizon: f64,
    },

    /// Failure reading a trace dataset file.
    #[error("failed to read trace file: {0}")]
    Csv(#[from] csv::Error),

    /// I/O failure on a trace dataset file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
