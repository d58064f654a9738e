//! Migrate command implementation.
//!
//! This module maps the command line onto a pipeline run, shows live
//! progress, and prints the resume point when the run is aborted.

use crate::display::parse_timestamp;
use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use whisperflux_lib::prelude::*;
use whisperflux_lib::{Stats, to_unix};

/// Arguments of the migrate command.
#[derive(Debug, Args)]
pub(crate) struct MigrateArgs {
    /// Location where all whisper files are stored
    #[arg(long, default_value = "/opt/graphite/storage/whisper/")]
    whisper_dir: PathBuf,

    /// Number of concurrent whisper readers
    #[arg(long, default_value_t = 10)]
    whisper_workers: usize,

    /// Number of concurrent InfluxDB writers
    #[arg(long, default_value_t = 10)]
    influx_workers: usize,

    /// Start of the interval, unix seconds or YYYY-MM-DD. Defaults to 24 hours ago.
    #[arg(long, conflicts_with = "all")]
    from: Option<String>,

    /// End of the interval, unix seconds or YYYY-MM-DD. Defaults to now.
    #[arg(long, conflicts_with = "all")]
    until: Option<String>,

    /// Copy every point of every archive instead of querying a time range
    #[arg(long)]
    all: bool,

    /// InfluxDB host
    #[arg(long, env = "WHISPERFLUX_INFLUX_HOST", default_value = "localhost")]
    influx_host: String,

    /// InfluxDB port
    #[arg(long, env = "WHISPERFLUX_INFLUX_PORT", default_value_t = 8086)]
    influx_port: u16,

    /// InfluxDB user
    #[arg(long, env = "WHISPERFLUX_INFLUX_USER", default_value = "graphite")]
    influx_user: String,

    /// InfluxDB password
    #[arg(
        long,
        env = "WHISPERFLUX_INFLUX_PASS",
        default_value = "graphite",
        hide_env_values = true
    )]
    influx_pass: String,

    /// InfluxDB database
    #[arg(long, env = "WHISPERFLUX_INFLUX_DB", default_value = "graphite")]
    influx_db: String,

    /// InfluxDB retention policy. Defaults to the database's default policy.
    #[arg(long, env = "WHISPERFLUX_INFLUX_RETENTION_POLICY")]
    influx_retention_policy: Option<String>,

    /// Prepended to every measurement name
    #[arg(long, default_value = "")]
    influx_prefix: String,

    /// Absolute path of a whisper file from which to resume processing
    #[arg(long)]
    skip_until: Option<PathBuf>,

    /// Only process files whose path contains this string
    #[arg(long)]
    include: Option<String>,

    /// Don't process files whose path contains this string
    #[arg(long)]
    exclude: Option<String>,

    /// Skip whisper files that cannot be read instead of stopping
    #[arg(long)]
    skip_whisper_errors: bool,

    /// Retry failed InfluxDB writes instead of stopping
    #[arg(long)]
    skip_influx_errors: bool,

    /// Give up after this many attempts per write. Retries forever when omitted.
    #[arg(long, requires = "skip_influx_errors")]
    influx_max_retries: Option<u32>,

    /// Seconds to wait between write attempts
    #[arg(long, default_value_t = 5)]
    influx_retry_backoff: u64,

    /// Capacity of each queue between stages
    #[arg(long, default_value_t = 1)]
    queue_capacity: usize,

    /// Seconds between stats log lines (0 disables)
    #[arg(long, default_value_t = 10)]
    stats_interval: u64,
}

impl MigrateArgs {
    fn read_mode(&self) -> Result<ReadMode> {
        if self.all {
            return Ok(ReadMode::Full);
        }
        let now = Utc::now();
        let from = match &self.from {
            Some(s) => parse_timestamp(s)?,
            None => to_unix(now - TimeDelta::hours(24))?,
        };
        let until = match &self.until {
            Some(s) => parse_timestamp(s)?,
            None => to_unix(now)?,
        };
        Ok(ReadMode::Range(TimeRange::new(from, until)?))
    }

    fn influx_config(&self) -> InfluxConfig {
        InfluxConfig {
            url: format!("http://{}:{}", self.influx_host, self.influx_port),
            username: Some(self.influx_user.clone()),
            password: Some(self.influx_pass.clone()),
            database: self.influx_db.clone(),
            retention_policy: self.influx_retention_policy.clone(),
            ..InfluxConfig::default()
        }
    }

    fn pipeline_config(&self) -> Result<PipelineConfig> {
        // drops any trailing separator
        let root: PathBuf = self.whisper_dir.components().collect();

        let write_failure = if self.skip_influx_errors {
            WriteFailurePolicy::Retry {
                max_attempts: self.influx_max_retries,
                backoff: Duration::from_secs(self.influx_retry_backoff),
            }
        } else {
            WriteFailurePolicy::Abort
        };
        let read_failure = if self.skip_whisper_errors {
            ReadFailurePolicy::Skip
        } else {
            ReadFailurePolicy::Abort
        };

        Ok(PipelineConfig {
            root,
            read_mode: self.read_mode()?,
            extract_workers: self.whisper_workers,
            load_workers: self.influx_workers,
            queue_capacity: self.queue_capacity,
            filter: FilterConfig {
                include: self.include.clone(),
                exclude: self.exclude.clone(),
                skip_until: self.skip_until.clone(),
            },
            read_failure,
            write_failure,
            measurement_prefix: self.influx_prefix.clone(),
            stats_interval: Some(Duration::from_secs(self.stats_interval)),
            ..PipelineConfig::default()
        })
    }
}

/// Run a migration. Returns the process exit status.
pub(crate) async fn migrate(args: MigrateArgs, quiet: bool) -> Result<i32> {
    let config = args.pipeline_config()?;
    match config.read_mode {
        ReadMode::Range(range) => tracing::info!(%range, "querying time range"),
        ReadMode::Full => tracing::info!("copying all archives"),
    }

    let writer =
        InfluxWriter::new(args.influx_config()).context("Failed to create InfluxDB client")?;
    let pipeline = Pipeline::new(config, WhisperSource, writer)?;

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };
    let ticker = tokio::spawn(update_progress(pipeline.stats(), progress.clone()));

    let outcome = pipeline.run().await;
    ticker.abort();
    progress.finish_and_clear();

    let outcome = outcome.context("Migration pipeline failed")?;
    let stats = outcome.stats();
    match &outcome {
        Outcome::Completed {
            discovery,
            abandoned,
            ..
        } => {
            if !quiet {
                println!(
                    "Migrated {} series ({} points) from {} files",
                    stats.batches_written, stats.points_written, discovery.emitted
                );
            }
            if !abandoned.is_empty() {
                println!("{} files could not be read:", abandoned.len());
                for unit in abandoned {
                    println!("  {unit}");
                }
            }
        }
        Outcome::Aborted { resume, .. } => {
            if let Some(unit) = resume {
                println!(
                    "the next file that needed processing was {unit}, you can resume from there"
                );
            }
        }
    }

    Ok(outcome.exit_code())
}

async fn update_progress(stats: Arc<Stats>, progress: ProgressBar) {
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    loop {
        ticker.tick().await;
        let s = stats.snapshot();
        progress.set_message(format!(
            "{} files found, {} written ({} points), {} empty, {} unreadable",
            s.discovered, s.batches_written, s.points_written, s.empty_batches, s.read_failures
        ));
    }
}
