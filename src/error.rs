//! Error types for the telemetry viewport core.
//!
//! Errors are split by how they are handled: sample errors skip one sample
//! and let ingestion continue, config errors reject an operation and leave
//! prior state untouched, fetch errors are absorbed at the scheduler
//! boundary. An empty store is never an error.

use crate::collector::types::Axis;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A sample that was refused by the store or by an ingestion source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidSampleError {
    /// Timestamp earlier than the newest sample already stored
    #[error("out-of-order timestamp {timestamp} (store last is {last})")]
    OutOfOrder {
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    /// Timestamp text that no supported format could parse
    #[error("unparseable timestamp '{0}'")]
    UnparseableTimestamp(String),

    /// Axis value that is not a number
    #[error("non-numeric {axis} value '{raw}'")]
    NonNumeric { axis: Axis, raw: String },

    /// A required column is missing from a record
    #[error("missing column '{0}'")]
    MissingColumn(String),

    /// A record the CSV reader could not split into fields
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

/// An operation or configuration that was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidConfigError {
    #[error("window size must be at least 1")]
    NonPositiveSize,

    #[error("step must not be negative (got {0}); use the opposite operation")]
    NegativeStep(i64),

    #[error("capacity must be at least 1 when bounded")]
    ZeroCapacity,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("batch size must be at least 1")]
    ZeroBatch,

    #[error("invalid distribution parameters: {0}")]
    Distribution(String),
}

/// Failure of an ingestion source to produce a batch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to read source: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("source is missing required column '{0}'")]
    MissingColumn(String),

    #[error("source not configured: {0}")]
    NotConfigured(String),

    #[error("invalid source settings: {0}")]
    Config(#[from] InvalidConfigError),

    #[error("fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("fetch task aborted: {0}")]
    Aborted(String),
}

/// Result type alias for source fetches.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = InvalidSampleError::NonNumeric {
            axis: Axis::Y,
            raw: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "non-numeric y value 'abc'");

        let err = InvalidConfigError::NegativeStep(-3);
        assert!(err.to_string().contains("-3"));

        let err = InvalidConfigError::ZeroDuration("refresh interval");
        assert_eq!(err.to_string(), "refresh interval must be greater than zero");
    }

    #[test]
    fn test_fetch_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: FetchError = io_err.into();
        assert!(matches!(err, FetchError::Io(_)));
    }
}
