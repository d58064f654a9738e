//! Error types for whisperflux.

use thiserror::Error;

/// Errors that can surface from a migration run.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Walking the source tree failed.
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Reading a source archive failed.
    #[error("Read error for '{path}': {message}")]
    Read {
        /// The archive that could not be read.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// Writing to the destination failed.
    #[error("Write error for '{measurement}': {message}")]
    Write {
        /// The measurement that could not be written.
        measurement: String,
        /// Description of the failure.
        message: String,
    },
}

/// Error for invalid time ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeRangeError {
    /// Start is after end.
    #[error("Invalid time range: {from} > {until}")]
    Inverted {
        /// The start timestamp.
        from: u32,
        /// The end timestamp.
        until: u32,
    },

    /// Timestamp does not fit the 32-bit unix seconds used by whisper.
    #[error("Timestamp {0} is outside the supported range")]
    OutOfBounds(i64),
}
