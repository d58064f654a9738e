//! Open whisper files.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use chrono::Utc;
use whisperflux_types::Point;

use crate::header::{encode_point, parse_points};
use crate::{ArchiveInfo, Header, WhisperError};

/// An open whisper file.
///
/// Generic over the underlying reader so archives can be read from memory in
/// tests; on disk this is a [`File`].
#[derive(Debug)]
pub struct WhisperFile<R> {
    inner: R,
    header: Header,
}

impl WhisperFile<File> {
    /// Opens a whisper file for reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its header is invalid.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WhisperError> {
        Self::from_reader(File::open(path)?)
    }

    /// Opens a whisper file for reading and writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its header is invalid.
    pub fn open_rw(path: impl AsRef<Path>) -> Result<Self, WhisperError> {
        Self::from_reader(OpenOptions::new().read(true).write(true).open(path)?)
    }
}

impl<R: Read + Seek> WhisperFile<R> {
    /// Parses the header from `inner` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is truncated or malformed.
    pub fn from_reader(mut inner: R) -> Result<Self, WhisperError> {
        inner.seek(SeekFrom::Start(0))?;
        let header = Header::read_from(&mut inner)?;
        Ok(Self { inner, header })
    }

    /// Returns the parsed header.
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Fetches the points recorded between `from` and `until`, relative to the
    /// current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is inverted or the archive cannot be read.
    pub fn fetch(&mut self, from: u32, until: u32) -> Result<Vec<Point>, WhisperError> {
        let now = u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX);
        self.fetch_at(from, until, now)
    }

    /// Fetches the points recorded between `from` and `until` as seen at `now`.
    ///
    /// The range is clamped to the file's retention window and served from the
    /// finest archive whose retention reaches back to `from`. Slots whose
    /// stored timestamp does not match the expected interval hold stale or no
    /// data and are omitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the range is inverted or the archive cannot be read.
    pub fn fetch_at(
        &mut self,
        from: u32,
        until: u32,
        now: u32,
    ) -> Result<Vec<Point>, WhisperError> {
        if from > until {
            return Err(WhisperError::InvalidRange { from, until });
        }

        let oldest = now.saturating_sub(self.header.metadata.max_retention);
        if from > now || until < oldest {
            return Ok(Vec::new());
        }
        let from = from.max(oldest);
        let until = until.min(now);

        let diff = now - from;
        let archive = *self
            .header
            .archives
            .iter()
            .find(|a| a.retention() >= diff)
            .or_else(|| self.header.archives.last())
            .ok_or(WhisperError::NoArchives)?;

        let step = u64::from(archive.seconds_per_point);
        let from_interval = align(u64::from(from), step) + step;
        let mut until_interval = align(u64::from(until), step) + step;
        if from_interval == until_interval {
            until_interval += step;
        }

        let base = self.base_interval(&archive)?;
        if base == 0 {
            return Ok(Vec::new());
        }

        let count = ((until_interval - from_interval) / step).min(u64::from(archive.points));
        let start = slot_index(&archive, base, from_interval);
        let slots = self.read_slots(&archive, start, count)?;

        Ok(slots
            .into_iter()
            .zip((0..).map(|i| from_interval + i * step))
            .filter(|(point, expected)| u64::from(point.timestamp) == *expected)
            .map(|(point, _)| point)
            .collect())
    }

    /// Reads every slot of archive `index` in storage order.
    ///
    /// Unwritten slots come back as zero-timestamp sentinels.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range or the read fails.
    pub fn dump_archive(&mut self, index: usize) -> Result<Vec<Point>, WhisperError> {
        let archive = self.archive(index)?;
        self.read_slots(&archive, 0, u64::from(archive.points))
    }

    fn archive(&self, index: usize) -> Result<ArchiveInfo, WhisperError> {
        self.header
            .archives
            .get(index)
            .copied()
            .ok_or(WhisperError::ArchiveIndex {
                index,
                count: self.header.archives.len(),
            })
    }

    /// Timestamp of the archive's first slot, or 0 if never written.
    fn base_interval(&mut self, archive: &ArchiveInfo) -> Result<u64, WhisperError> {
        Ok(self
            .read_slots(archive, 0, 1)?
            .first()
            .map_or(0, |p| u64::from(p.timestamp)))
    }

    /// Reads `count` slots starting at slot `start`, wrapping at the archive end.
    fn read_slots(
        &mut self,
        archive: &ArchiveInfo,
        start: u64,
        count: u64,
    ) -> Result<Vec<Point>, WhisperError> {
        let total = u64::from(archive.points);
        let first = count.min(total - start);
        let mut data = vec![0u8; (count as usize) * Point::SIZE];

        let (head, tail) = data.split_at_mut(first as usize * Point::SIZE);
        self.inner
            .seek(SeekFrom::Start(slot_offset(archive, start)))?;
        self.inner.read_exact(head)?;
        if !tail.is_empty() {
            self.inner
                .seek(SeekFrom::Start(u64::from(archive.offset)))?;
            self.inner.read_exact(tail)?;
        }

        Ok(parse_points(&data))
    }
}

impl<R: Read + Write + Seek> WhisperFile<R> {
    /// Stores `point` in archive `index`, aligned to the archive resolution.
    ///
    /// Only the given archive is touched; no roll-up into coarser archives
    /// happens.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range or the write fails.
    pub fn write_point(&mut self, index: usize, point: Point) -> Result<(), WhisperError> {
        let archive = self.archive(index)?;
        let step = u64::from(archive.seconds_per_point);
        let interval = align(u64::from(point.timestamp), step);

        let base = self.base_interval(&archive)?;
        let slot = if base == 0 {
            0
        } else {
            slot_index(&archive, base, interval)
        };

        // interval <= point.timestamp, so it fits back into u32
        let aligned = Point::new(interval as u32, point.value);
        self.inner.seek(SeekFrom::Start(slot_offset(&archive, slot)))?;
        self.inner.write_all(&encode_point(aligned))?;
        Ok(())
    }

    /// Flushes pending writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> Result<(), WhisperError> {
        self.inner.flush()?;
        Ok(())
    }
}

const fn align(timestamp: u64, step: u64) -> u64 {
    timestamp - timestamp % step
}

fn slot_index(archive: &ArchiveInfo, base: u64, interval: u64) -> u64 {
    let distance = (interval as i64 - base as i64) / i64::from(archive.seconds_per_point);
    distance.rem_euclid(i64::from(archive.points)) as u64
}

fn slot_offset(archive: &ArchiveInfo, slot: u64) -> u64 {
    u64::from(archive.offset) + slot * Point::SIZE as u64
}
