//! Work units and the batches extracted from them.

use std::path::{Path, PathBuf};

use crate::Point;

/// One source archive file, identified by its path.
///
/// The path is the unit's key across every pipeline stage; two units are the
/// same unit iff their paths are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkUnit(PathBuf);

impl WorkUnit {
    /// Creates a work unit for the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Returns the archive path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Consumes the unit, returning its path.
    #[must_use]
    pub fn into_path(self) -> PathBuf {
        self.0
    }
}

impl From<PathBuf> for WorkUnit {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl std::fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Points extracted from a single work unit.
#[derive(Debug, Clone)]
pub struct PointBatch {
    /// The unit the points were read from.
    pub unit: WorkUnit,
    /// Points in extraction order.
    pub points: Vec<Point>,
}

impl PointBatch {
    /// Creates a batch, dropping any "no data" sentinel points.
    #[must_use]
    pub fn new(unit: WorkUnit, mut points: Vec<Point>) -> Self {
        points.retain(|p| !p.is_sentinel());
        Self { unit, points }
    }

    /// Returns true if the batch holds no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the number of points in the batch.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_drops_sentinels() {
        let unit = WorkUnit::new("/whisper/a.wsp");
        let batch = PointBatch::new(
            unit.clone(),
            vec![Point::new(0, 9.0), Point::new(60, 1.0), Point::new(0, 0.0)],
        );

        assert_eq!(batch.unit, unit);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.points[0], Point::new(60, 1.0));
    }

    #[test]
    fn test_empty_batch() {
        let batch = PointBatch::new(WorkUnit::new("/whisper/a.wsp"), vec![]);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_work_unit_display() {
        let unit = WorkUnit::from(PathBuf::from("/whisper/servers/web1/load.wsp"));
        assert_eq!(unit.to_string(), "/whisper/servers/web1/load.wsp");
        assert_eq!(unit.path(), Path::new("/whisper/servers/web1/load.wsp"));
    }
}
