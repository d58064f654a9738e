//! Migrate Graphite whisper archives into InfluxDB.
//!
//! This is a facade crate that re-exports functionality from the whisperflux
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use whisperflux_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let writer = InfluxWriter::new(InfluxConfig::default())?;
//!     let config = PipelineConfig {
//!         read_mode: ReadMode::Full,
//!         ..PipelineConfig::default()
//!     };
//!
//!     let outcome = Pipeline::new(config, WhisperSource, writer)?.run().await?;
//!     if let Outcome::Aborted { resume: Some(unit), .. } = &outcome {
//!         println!("resume from {unit}");
//!     }
//!     std::process::exit(outcome.exit_code());
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/whisperflux/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use whisperflux_types::*;

// Re-export the pipeline
pub use whisperflux_pipeline::{
    Discovery, DiscoverySummary, ExitSignal, FATAL, FilterConfig, InProgress, Outcome, Pipeline,
    PipelineConfig, PipelineError, ReadFailurePolicy, Stats, StatsSnapshot, TimerSnapshot,
    WriteFailurePolicy, measurement_name,
};

// Re-export the whisper reader
#[cfg(feature = "whisper")]
pub use whisperflux_whisper::{
    AggregationMethod, ArchiveInfo, ArchiveSpec, Header, Metadata, WhisperError, WhisperFile,
    WhisperSource,
};

// Re-export the InfluxDB writer
#[cfg(feature = "influx")]
pub use whisperflux_influx::{InfluxConfig, InfluxWriter, Precision, WriteError};

/// Prelude module for convenient imports.
///
/// ```
/// use whisperflux_lib::prelude::*;
/// ```
pub mod prelude {
    pub use whisperflux_types::{
        ArchiveHandle, ArchiveSource, MigrateError, Point, PointWriter, ReadMode, Series,
        TimeRange, WorkUnit,
    };

    pub use whisperflux_pipeline::{
        FilterConfig, Outcome, Pipeline, PipelineConfig, ReadFailurePolicy, WriteFailurePolicy,
    };

    #[cfg(feature = "whisper")]
    pub use whisperflux_whisper::{WhisperFile, WhisperSource};

    #[cfg(feature = "influx")]
    pub use whisperflux_influx::{InfluxConfig, InfluxWriter};
}
