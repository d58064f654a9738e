//! Destination collaborator interface.

use async_trait::async_trait;

use crate::Point;

/// A named batch of points destined for one write call.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Measurement name at the destination.
    pub name: String,
    /// Points in write order; later points win on duplicate timestamps.
    pub points: Vec<Point>,
}

impl Series {
    /// Creates a new series.
    #[must_use]
    pub fn new(name: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Returns true if the series has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the number of points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }
}

impl std::fmt::Display for Series {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "series '{}' ({} points)", self.name, self.points.len())
    }
}

/// Writes series to the destination store.
///
/// Writes must be idempotent: writing the same series twice leaves the
/// destination in the same state as writing it once.
#[async_trait]
pub trait PointWriter: Send + Sync + 'static {
    /// Error raised by a failed write.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Writes one series.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination rejects or does not acknowledge the write.
    async fn write(&self, series: &Series) -> Result<(), Self::Error>;
}
