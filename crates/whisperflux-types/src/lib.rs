//! Core types for the whisperflux migrator.
//!
//! This crate provides the fundamental data structures used throughout whisperflux:
//!
//! - [`Point`] - A single `(timestamp, value)` sample
//! - [`WorkUnit`] - One source archive file, identified by its path
//! - [`PointBatch`] - Points extracted from one work unit
//! - [`Series`] - A named batch ready for the destination
//! - [`TimeRange`] - Bounded range for time-range extraction
//! - [`ArchiveSource`] / [`ArchiveHandle`] - Source collaborator interface
//! - [`PointWriter`] - Destination collaborator interface

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/whisperflux/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod point;
mod sink;
mod source;
mod time_range;
mod unit;

pub use error::{MigrateError, TimeRangeError};
pub use point::Point;
pub use sink::{PointWriter, Series};
pub use source::{ArchiveHandle, ArchiveSource, ReadMode};
pub use time_range::{TimeRange, to_unix};
pub use unit::{PointBatch, WorkUnit};
