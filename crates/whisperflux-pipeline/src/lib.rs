//! Migration pipeline for whisperflux.
//!
//! This crate moves points from an [`ArchiveSource`](whisperflux_types::ArchiveSource)
//! to a [`PointWriter`](whisperflux_types::PointWriter):
//!
//! - [`Discovery`] - Stable-order walk with filters and a skip cursor
//! - [`Pipeline`] - Extract and load pools joined by bounded queues
//! - [`InProgress`] / [`spawn_tracker`] - Discovery-ordered in-progress tracking
//! - [`ExitSignal`] - First-wins termination request
//! - [`Stats`] - Counters and timers, logged periodically

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/whisperflux/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod discovery;
mod error;
mod exit;
mod extract;
mod load;
mod pipeline;
mod stats;
mod tracker;

pub use config::{FilterConfig, PipelineConfig, ReadFailurePolicy, WriteFailurePolicy};
pub use discovery::{ARCHIVE_SUFFIX, Discovery, DiscoverySummary, is_candidate};
pub use error::PipelineError;
pub use exit::{ExitSignal, FATAL};
pub use extract::read_unit;
pub use load::measurement_name;
pub use pipeline::{Outcome, Pipeline};
pub use stats::{Stats, StatsSnapshot, Timer, TimerSnapshot};
pub use tracker::{InProgress, Snapshot, TrackerHandle, TrackerReport, spawn_tracker};
