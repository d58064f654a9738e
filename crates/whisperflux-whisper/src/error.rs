//! Whisper reader errors.

use thiserror::Error;

/// Errors that can occur while reading or writing a whisper file.
#[derive(Error, Debug)]
pub enum WhisperError {
    /// Underlying I/O failure, including truncated files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown aggregation method id in the header.
    #[error("Unknown aggregation method: {0}")]
    InvalidAggregation(u32),

    /// The header declares no archives.
    #[error("Whisper file has no archives")]
    NoArchives,

    /// The archive table runs past the end of the file.
    #[error("Header declares {archive_count} archives but the file is only {len} bytes")]
    TruncatedHeader {
        /// Archive count read from the metadata block.
        archive_count: u32,
        /// Length of the file.
        len: u64,
    },

    /// An archive declares zero points, a zero resolution, or point data
    /// beyond the end of the file.
    #[error("Archive {0} is malformed")]
    MalformedArchive(usize),

    /// Archive index out of range.
    #[error("Archive index {index} out of range (file has {count} archives)")]
    ArchiveIndex {
        /// The requested index.
        index: usize,
        /// Number of archives in the file.
        count: usize,
    },

    /// Fetch range with from > until.
    #[error("Invalid fetch range: {from} > {until}")]
    InvalidRange {
        /// Range start.
        from: u32,
        /// Range end.
        until: u32,
    },
}
