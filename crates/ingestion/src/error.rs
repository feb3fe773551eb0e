//! Ingestion error types

use thiserror::Error;

/// Producer-side errors
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Stream rate must be positive and finite
    #[error("invalid rate for {stream} stream: {hz} Hz")]
    InvalidRate { stream: &'static str, hz: f64 },

    /// Period or latency does not fit in a `Duration`
    #[error("{what} of {stream} stream out of range: {seconds} s")]
    DurationOutOfRange {
        stream: &'static str,
        what: &'static str,
        seconds: f64,
    },

    /// `start` called on a source that is still running
    #[error("source is already running")]
    AlreadyRunning,
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
