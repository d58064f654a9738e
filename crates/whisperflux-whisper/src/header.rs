//! Whisper header parsing.
//!
//! A whisper file starts with a 16-byte metadata block followed by one
//! 12-byte entry per archive, all big-endian:
//!
//! - metadata: `u32` aggregation method, `u32` max retention,
//!   `f32` x-files factor, `u32` archive count
//! - archive info: `u32` byte offset, `u32` seconds per point, `u32` points
//!
//! Archives are ordered finest resolution first.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ByteOrder};
use whisperflux_types::Point;

use crate::WhisperError;

/// How a whisper file rolls finer points up into coarser archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMethod {
    /// Arithmetic mean.
    Average,
    /// Sum.
    Sum,
    /// Last value.
    Last,
    /// Maximum.
    Max,
    /// Minimum.
    Min,
    /// Mean treating missing slots as zero.
    AvgZero,
    /// Value with the largest magnitude.
    AbsMax,
    /// Value with the smallest magnitude.
    AbsMin,
}

impl AggregationMethod {
    /// Returns the numeric id stored in the header.
    #[must_use]
    pub const fn id(&self) -> u32 {
        match self {
            Self::Average => 1,
            Self::Sum => 2,
            Self::Last => 3,
            Self::Max => 4,
            Self::Min => 5,
            Self::AvgZero => 6,
            Self::AbsMax => 7,
            Self::AbsMin => 8,
        }
    }

    /// Returns the method name as used by Graphite.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Sum => "sum",
            Self::Last => "last",
            Self::Max => "max",
            Self::Min => "min",
            Self::AvgZero => "avg_zero",
            Self::AbsMax => "absmax",
            Self::AbsMin => "absmin",
        }
    }
}

impl TryFrom<u32> for AggregationMethod {
    type Error = WhisperError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Self::Average),
            2 => Ok(Self::Sum),
            3 => Ok(Self::Last),
            4 => Ok(Self::Max),
            5 => Ok(Self::Min),
            6 => Ok(Self::AvgZero),
            7 => Ok(Self::AbsMax),
            8 => Ok(Self::AbsMin),
            other => Err(WhisperError::InvalidAggregation(other)),
        }
    }
}

impl std::fmt::Display for AggregationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// File-level metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metadata {
    /// Aggregation method.
    pub aggregation: AggregationMethod,
    /// Retention of the coarsest archive, in seconds.
    pub max_retention: u32,
    /// Fraction of known points required to aggregate.
    pub x_files_factor: f32,
    /// Number of archives.
    pub archive_count: u32,
}

impl Metadata {
    /// Size in bytes of the metadata block.
    pub const SIZE: usize = 16;
}

/// Location and shape of one retention archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveInfo {
    /// Byte offset of the first point.
    pub offset: u32,
    /// Resolution in seconds.
    pub seconds_per_point: u32,
    /// Number of point slots.
    pub points: u32,
}

impl ArchiveInfo {
    /// Size in bytes of an archive info entry.
    pub const SIZE: usize = 12;

    /// Returns the seconds covered by this archive.
    #[must_use]
    pub const fn retention(&self) -> u32 {
        self.seconds_per_point.saturating_mul(self.points)
    }

    /// Returns the size in bytes of the point data.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.points as u64 * Point::SIZE as u64
    }
}

/// Parsed whisper header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// File-level metadata.
    pub metadata: Metadata,
    /// Archives, finest resolution first.
    pub archives: Vec<ArchiveInfo>,
}

impl Header {
    /// Reads a header from the start of `reader`.
    ///
    /// The archive table and every archive's point data must fit inside the
    /// stream, so a corrupt header is rejected before anything is allocated
    /// from its counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is truncated or malformed.
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self, WhisperError> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let mut buf = [0u8; Metadata::SIZE];
        reader.read_exact(&mut buf)?;

        let metadata = Metadata {
            aggregation: AggregationMethod::try_from(BigEndian::read_u32(&buf[0..4]))?,
            max_retention: BigEndian::read_u32(&buf[4..8]),
            x_files_factor: BigEndian::read_f32(&buf[8..12]),
            archive_count: BigEndian::read_u32(&buf[12..16]),
        };

        if metadata.archive_count == 0 {
            return Err(WhisperError::NoArchives);
        }

        let table_len = u64::from(metadata.archive_count) * ArchiveInfo::SIZE as u64;
        if Metadata::SIZE as u64 + table_len > len {
            return Err(WhisperError::TruncatedHeader {
                archive_count: metadata.archive_count,
                len,
            });
        }

        let mut table = vec![0u8; table_len as usize];
        reader.read_exact(&mut table)?;

        let archives = table
            .chunks_exact(ArchiveInfo::SIZE)
            .enumerate()
            .map(|(index, chunk)| {
                let info = ArchiveInfo {
                    offset: BigEndian::read_u32(&chunk[0..4]),
                    seconds_per_point: BigEndian::read_u32(&chunk[4..8]),
                    points: BigEndian::read_u32(&chunk[8..12]),
                };
                if info.points == 0
                    || info.seconds_per_point == 0
                    || u64::from(info.offset) + info.size() > len
                {
                    return Err(WhisperError::MalformedArchive(index));
                }
                Ok(info)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { metadata, archives })
    }

    /// Encodes the header in on-disk layout.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.encoded_len()];
        BigEndian::write_u32(&mut bytes[0..4], self.metadata.aggregation.id());
        BigEndian::write_u32(&mut bytes[4..8], self.metadata.max_retention);
        BigEndian::write_f32(&mut bytes[8..12], self.metadata.x_files_factor);
        BigEndian::write_u32(&mut bytes[12..16], self.metadata.archive_count);

        for (chunk, info) in bytes[Metadata::SIZE..]
            .chunks_exact_mut(ArchiveInfo::SIZE)
            .zip(&self.archives)
        {
            BigEndian::write_u32(&mut chunk[0..4], info.offset);
            BigEndian::write_u32(&mut chunk[4..8], info.seconds_per_point);
            BigEndian::write_u32(&mut chunk[8..12], info.points);
        }

        bytes
    }

    /// Returns the size in bytes of the encoded header.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        Metadata::SIZE + self.archives.len() * ArchiveInfo::SIZE
    }

    /// Returns the total number of point slots across all archives.
    #[must_use]
    pub fn total_points(&self) -> usize {
        self.archives.iter().map(|a| a.points as usize).sum()
    }
}

/// Decodes a run of 12-byte point records.
pub(crate) fn parse_points(data: &[u8]) -> Vec<Point> {
    data.chunks_exact(Point::SIZE).map(parse_single_point).collect()
}

#[inline]
fn parse_single_point(data: &[u8]) -> Point {
    Point::new(
        BigEndian::read_u32(&data[0..4]),
        BigEndian::read_f64(&data[4..12]),
    )
}

/// Encodes a single point record.
pub(crate) fn encode_point(point: Point) -> [u8; Point::SIZE] {
    let mut bytes = [0u8; Point::SIZE];
    BigEndian::write_u32(&mut bytes[0..4], point.timestamp);
    BigEndian::write_f64(&mut bytes[4..12], point.value);
    bytes
}
