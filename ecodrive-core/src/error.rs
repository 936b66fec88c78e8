//! Errors in the core crate.
use thiserror::Error;

/// Errors raised when accessing values in a [`Record`](crate::record::Record).
#[derive(Error, Debug)]
pub enum RecordError {
    /// The requested key does not exist in the record.
    #[error("record key not found: {0}")]
    KeyNotFound(String),

    /// The value under the key has a different type than requested.
    #[error("record value type mismatch, expected {0}")]
    TypeMismatch(String),
}
