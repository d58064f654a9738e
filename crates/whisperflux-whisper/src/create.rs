//! Creation of empty whisper files.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use whisperflux_types::Point;

use crate::{AggregationMethod, ArchiveInfo, Header, Metadata, WhisperError, WhisperFile};

/// Resolution and size of an archive to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSpec {
    /// Resolution in seconds.
    pub seconds_per_point: u32,
    /// Number of slots.
    pub points: u32,
}

impl ArchiveSpec {
    /// Creates a new archive spec.
    #[must_use]
    pub const fn new(seconds_per_point: u32, points: u32) -> Self {
        Self {
            seconds_per_point,
            points,
        }
    }
}

/// Writes the header and zeroed point slots of a new whisper file.
///
/// Archives must be given finest resolution first.
///
/// # Errors
///
/// Returns an error if no archives are given, an archive is empty, or the
/// write fails.
pub fn write_empty<W: Write>(
    writer: &mut W,
    archives: &[ArchiveSpec],
    aggregation: AggregationMethod,
    x_files_factor: f32,
) -> Result<Header, WhisperError> {
    if archives.is_empty() {
        return Err(WhisperError::NoArchives);
    }

    let mut offset = Metadata::SIZE + archives.len() * ArchiveInfo::SIZE;
    let mut infos = Vec::with_capacity(archives.len());
    for (index, spec) in archives.iter().enumerate() {
        if spec.points == 0 || spec.seconds_per_point == 0 {
            return Err(WhisperError::MalformedArchive(index));
        }
        infos.push(ArchiveInfo {
            offset: offset as u32,
            seconds_per_point: spec.seconds_per_point,
            points: spec.points,
        });
        offset += spec.points as usize * Point::SIZE;
    }

    let header = Header {
        metadata: Metadata {
            aggregation,
            max_retention: infos.iter().map(ArchiveInfo::retention).max().unwrap_or(0),
            x_files_factor,
            archive_count: infos.len() as u32,
        },
        archives: infos,
    };

    writer.write_all(&header.to_bytes())?;
    writer.write_all(&vec![0u8; header.total_points() * Point::SIZE])?;
    writer.flush()?;

    Ok(header)
}

/// Creates a new whisper file at `path`, failing if it already exists.
///
/// # Errors
///
/// Returns an error if the file exists, the archives are invalid, or I/O fails.
pub fn create(
    path: impl AsRef<Path>,
    archives: &[ArchiveSpec],
    aggregation: AggregationMethod,
    x_files_factor: f32,
) -> Result<WhisperFile<std::fs::File>, WhisperError> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(path)?;
    write_empty(&mut file, archives, aggregation, x_files_factor)?;
    WhisperFile::from_reader(file)
}
