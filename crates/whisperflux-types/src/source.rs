//! Source collaborator interface.

use std::path::Path;

use crate::{Point, TimeRange};

/// How points are pulled out of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Query the best archive for the given range.
    Range(TimeRange),
    /// Dump every archive, coarsest first.
    Full,
}

/// Opens archives by path.
///
/// Implementations are shared across extract workers and must not keep
/// per-call state.
pub trait ArchiveSource: Send + Sync + 'static {
    /// Handle to an open archive. Dropping it closes the archive.
    type Handle: ArchiveHandle;

    /// Opens the archive at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be opened or its header is invalid.
    fn open(
        &self,
        path: &Path,
    ) -> Result<Self::Handle, <Self::Handle as ArchiveHandle>::Error>;
}

/// An open archive.
pub trait ArchiveHandle: Send {
    /// Error raised by reads.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the points recorded within `range`, in time order.
    ///
    /// Slots without data are omitted rather than zero-filled.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be read.
    fn fetch(&mut self, range: TimeRange) -> Result<Vec<Point>, Self::Error>;

    /// Returns the number of retention archives, finest first.
    fn archive_count(&self) -> usize;

    /// Returns the total number of point slots across all archives.
    fn point_capacity(&self) -> usize;

    /// Reads every slot of archive `index` in storage order, sentinels included.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range or the archive cannot be read.
    fn dump_archive(&mut self, index: usize) -> Result<Vec<Point>, Self::Error>;
}
