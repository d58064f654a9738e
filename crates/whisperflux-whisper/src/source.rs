//! Filesystem-backed archive source.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use whisperflux_types::{ArchiveHandle, ArchiveSource, Point, TimeRange};

use crate::{WhisperError, WhisperFile};

/// Opens whisper files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhisperSource;

impl ArchiveSource for WhisperSource {
    type Handle = WhisperFile<File>;

    fn open(&self, path: &Path) -> Result<Self::Handle, WhisperError> {
        WhisperFile::open(path)
    }
}

impl<R: Read + Seek + Send> ArchiveHandle for WhisperFile<R> {
    type Error = WhisperError;

    fn fetch(&mut self, range: TimeRange) -> Result<Vec<Point>, Self::Error> {
        Self::fetch(self, range.from, range.until)
    }

    fn archive_count(&self) -> usize {
        self.header().archives.len()
    }

    fn point_capacity(&self) -> usize {
        self.header().total_points()
    }

    fn dump_archive(&mut self, index: usize) -> Result<Vec<Point>, Self::Error> {
        Self::dump_archive(self, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AggregationMethod, ArchiveSpec, create};
    use tempfile::TempDir;

    #[test]
    fn test_source_open_missing() {
        let result = WhisperSource.open(Path::new("/nonexistent/metric.wsp"));
        assert!(matches!(result, Err(WhisperError::Io(_))));
    }

    #[test]
    fn test_source_open_and_dump() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cpu.wsp");
        let mut file = create(
            &path,
            &[ArchiveSpec::new(10, 6), ArchiveSpec::new(60, 10)],
            AggregationMethod::Average,
            0.5,
        )
        .unwrap();
        file.write_point(1, Point::new(600, 2.5)).unwrap();
        drop(file);

        let mut handle = WhisperSource.open(&path).unwrap();
        assert_eq!(handle.archive_count(), 2);
        assert_eq!(handle.point_capacity(), 16);

        let dump = ArchiveHandle::dump_archive(&mut handle, 1).unwrap();
        assert_eq!(dump[0], Point::new(600, 2.5));
    }

    #[test]
    fn test_source_open_corrupt_archive_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.wsp");
        let mut bytes = vec![0u8; 28];
        bytes[3] = 1;
        bytes[12..16].copy_from_slice(&u32::MAX.to_be_bytes());
        std::fs::write(&path, bytes).unwrap();

        let result = WhisperSource.open(&path);
        assert!(matches!(result, Err(WhisperError::TruncatedHeader { .. })));
    }

    #[test]
    fn test_source_open_corrupt_point_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.wsp");
        drop(create(&path, &[ArchiveSpec::new(60, 10)], AggregationMethod::Last, 0.0).unwrap());

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[24..28].copy_from_slice(&u32::MAX.to_be_bytes());
        std::fs::write(&path, bytes).unwrap();

        let result = WhisperSource.open(&path);
        assert!(matches!(result, Err(WhisperError::MalformedArchive(0))));
    }
}
