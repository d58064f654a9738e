//! Graphite whisper archive reader for whisperflux.
//!
//! This crate reads the on-disk whisper format:
//!
//! - [`Header`] - Parsed metadata and archive table
//! - [`WhisperFile`] - An open whisper file supporting range fetches and dumps
//! - [`WhisperSource`] - [`ArchiveSource`](whisperflux_types::ArchiveSource) backed by the filesystem
//! - [`create`] - Writes an empty whisper file, mainly for fixtures and tooling

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/whisperflux/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod create;
mod error;
mod file;
mod header;
mod source;

pub use create::{ArchiveSpec, create, write_empty};
pub use error::WhisperError;
pub use file::WhisperFile;
pub use header::{AggregationMethod, ArchiveInfo, Header, Metadata};
pub use source::WhisperSource;
