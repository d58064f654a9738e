//! Time range for bounded extraction.

use chrono::{DateTime, TimeDelta, Utc};

use crate::TimeRangeError;

/// A range of unix timestamps (seconds) for data retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Start of the range.
    pub from: u32,
    /// End of the range.
    pub until: u32,
}

impl TimeRange {
    /// Creates a new time range, validating that from <= until.
    ///
    /// # Errors
    ///
    /// Returns an error if from > until.
    pub const fn new(from: u32, until: u32) -> Result<Self, TimeRangeError> {
        if from > until {
            return Err(TimeRangeError::Inverted { from, until });
        }
        Ok(Self { from, until })
    }

    /// Creates the range covering the `span` that ends at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if either bound does not fit in a 32-bit unix timestamp.
    pub fn trailing(span: TimeDelta, now: DateTime<Utc>) -> Result<Self, TimeRangeError> {
        let until = to_unix(now)?;
        let from = to_unix(now - span)?;
        Self::new(from, until)
    }

    /// Returns the number of seconds covered by the range.
    #[must_use]
    pub const fn duration_secs(&self) -> u32 {
        self.until - self.from
    }

    /// Returns true if the range contains the given timestamp.
    #[must_use]
    pub const fn contains(&self, timestamp: u32) -> bool {
        timestamp >= self.from && timestamp <= self.until
    }
}

/// Converts a UTC datetime into a 32-bit unix timestamp.
///
/// # Errors
///
/// Returns an error if the datetime is before the epoch or past 2106.
pub fn to_unix(at: DateTime<Utc>) -> Result<u32, TimeRangeError> {
    u32::try_from(at.timestamp()).map_err(|_| TimeRangeError::OutOfBounds(at.timestamp()))
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt = |ts: u32| {
            DateTime::<Utc>::from_timestamp(i64::from(ts), 0)
                .map_or_else(|| ts.to_string(), |dt| dt.to_rfc3339())
        };
        write!(f, "{} to {}", fmt(self.from), fmt(self.until))
    }
}
