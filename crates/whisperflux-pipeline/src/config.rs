//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use whisperflux_types::{ReadMode, TimeRange};

use crate::PipelineError;

/// What an extract worker does when an archive cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadFailurePolicy {
    /// Log the failure and move on. The unit stays in progress forever.
    Skip,
    /// Request process-wide exit.
    #[default]
    Abort,
}

/// What a load worker does when a write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFailurePolicy {
    /// Request process-wide exit.
    #[default]
    Abort,
    /// Sleep `backoff` and retry the same series.
    Retry {
        /// Total attempts before giving up; `None` retries forever.
        max_attempts: Option<u32>,
        /// Fixed delay between attempts.
        backoff: Duration,
    },
}

impl WriteFailurePolicy {
    /// Default delay between write attempts.
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

    /// Retry forever with the default backoff.
    #[must_use]
    pub const fn retry_forever() -> Self {
        Self::Retry {
            max_attempts: None,
            backoff: Self::DEFAULT_BACKOFF,
        }
    }
}

/// Which discovered files become work units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    /// Only paths containing this substring are migrated.
    pub include: Option<String>,
    /// Paths containing this substring are never migrated.
    pub exclude: Option<String>,
    /// Suppress units until this exact path has been walked past.
    pub skip_until: Option<PathBuf>,
}

/// Configuration for a migration run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the whisper tree.
    pub root: PathBuf,
    /// Range query or full dump.
    pub read_mode: ReadMode,
    /// Number of extract workers.
    pub extract_workers: usize,
    /// Number of load workers.
    pub load_workers: usize,
    /// Capacity of each hand-off queue.
    pub queue_capacity: usize,
    /// Discovery filters and skip cursor.
    pub filter: FilterConfig,
    /// Behaviour on unreadable archives.
    pub read_failure: ReadFailurePolicy,
    /// Behaviour on failed writes.
    pub write_failure: WriteFailurePolicy,
    /// Prepended verbatim to every measurement name.
    pub measurement_prefix: String,
    /// How long to wait for the tracker's report after an abort.
    pub exit_grace: Duration,
    /// Interval of the stats log; `None` disables it.
    pub stats_interval: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        // the trailing day always fits in u32 seconds until 2106
        let read_mode = TimeRange::trailing(TimeDelta::hours(24), Utc::now())
            .map_or(ReadMode::Full, ReadMode::Range);
        Self {
            root: PathBuf::from("/opt/graphite/storage/whisper"),
            read_mode,
            extract_workers: 10,
            load_workers: 10,
            queue_capacity: 1,
            filter: FilterConfig::default(),
            read_failure: ReadFailurePolicy::Abort,
            write_failure: WriteFailurePolicy::Abort,
            measurement_prefix: String::new(),
            exit_grace: Duration::from_secs(5),
            stats_interval: Some(Duration::from_secs(10)),
        }
    }
}

impl PipelineConfig {
    /// Checks that pool sizes and queue capacity are usable.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] naming the first bad value.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.extract_workers == 0 {
            return Err(PipelineError::Config(
                "extract worker count must be at least 1".to_string(),
            ));
        }
        if self.load_workers == 0 {
            return Err(PipelineError::Config(
                "load worker count must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(PipelineError::Config(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        if let WriteFailurePolicy::Retry {
            max_attempts: Some(0),
            ..
        } = self.write_failure
        {
            return Err(PipelineError::Config(
                "write retry bound must be at least 1 attempt".to_string(),
            ));
        }
        Ok(())
    }
}
