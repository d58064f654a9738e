//! Run coordination.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use whisperflux_types::{ArchiveSource, MigrateError, PointWriter, WorkUnit};

use crate::extract::ExtractWorker;
use crate::load::LoadWorker;
use crate::{
    Discovery, DiscoverySummary, ExitSignal, PipelineConfig, PipelineError, Stats, StatsSnapshot,
    TrackerReport, spawn_tracker,
};

/// How a run ended.
#[derive(Debug)]
pub enum Outcome {
    /// Every discovered unit went through the pipeline.
    Completed {
        /// What discovery saw.
        discovery: DiscoverySummary,
        /// Units abandoned after a skipped read failure, in discovery order.
        abandoned: Vec<WorkUnit>,
        /// Final counters.
        stats: StatsSnapshot,
    },
    /// The run was torn down by an exit request.
    Aborted {
        /// Requested exit status.
        code: i32,
        /// Oldest unit that had not been written, if the tracker reported in time.
        resume: Option<WorkUnit>,
        /// The error that triggered the exit.
        cause: Option<MigrateError>,
        /// Counters at the time of the abort.
        stats: StatsSnapshot,
    },
}

impl Outcome {
    /// Process exit status for this outcome.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } => 0,
            Self::Aborted { code, .. } => *code,
        }
    }

    /// Final counters.
    #[must_use]
    pub const fn stats(&self) -> &StatsSnapshot {
        match self {
            Self::Completed { stats, .. } | Self::Aborted { stats, .. } => stats,
        }
    }
}

/// A single migration run.
///
/// Owns the collaborators and shared stats; [`run`](Self::run) builds the
/// queues, spawns every stage and tears them down.
#[derive(Debug)]
pub struct Pipeline<S, W> {
    config: PipelineConfig,
    source: Arc<S>,
    writer: Arc<W>,
    stats: Arc<Stats>,
}

impl<S: ArchiveSource, W: PointWriter> Pipeline<S, W> {
    /// Creates a run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if the configuration is unusable.
    pub fn new(config: PipelineConfig, source: S, writer: W) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            source: Arc::new(source),
            writer: Arc::new(writer),
            stats: Arc::new(Stats::new()),
        })
    }

    /// Live counters, for progress display.
    #[must_use]
    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    /// Runs the migration to completion or abort.
    ///
    /// # Errors
    ///
    /// Returns an error only if the pipeline machinery itself fails; unit
    /// failures are reported through [`Outcome::Aborted`].
    pub async fn run(self) -> Result<Outcome, PipelineError> {
        let Self {
            config,
            source,
            writer,
            stats,
        } = self;

        let (tracker, tracker_task) = spawn_tracker();
        let exit = ExitSignal::new(tracker.clone());

        let (unit_tx, unit_rx) = mpsc::channel::<WorkUnit>(config.queue_capacity);
        let (batch_tx, batch_rx) = mpsc::channel(config.queue_capacity);
        let unit_rx = Arc::new(Mutex::new(unit_rx));
        let batch_rx = Arc::new(Mutex::new(batch_rx));

        let mut extract = JoinSet::new();
        for id in 0..config.extract_workers {
            extract.spawn(
                ExtractWorker {
                    id,
                    source: Arc::clone(&source),
                    mode: config.read_mode,
                    policy: config.read_failure,
                    units: Arc::clone(&unit_rx),
                    batches: batch_tx.clone(),
                    exit: exit.clone(),
                    stats: Arc::clone(&stats),
                }
                .run(),
            );
        }
        drop(batch_tx);
        drop(unit_rx);

        let mut load = JoinSet::new();
        for id in 0..config.load_workers {
            load.spawn(
                LoadWorker {
                    id,
                    writer: Arc::clone(&writer),
                    batches: Arc::clone(&batch_rx),
                    tracker: tracker.clone(),
                    exit: exit.clone(),
                    policy: config.write_failure,
                    root: config.root.clone(),
                    prefix: config.measurement_prefix.clone(),
                    stats: Arc::clone(&stats),
                }
                .run(),
            );
        }
        drop(batch_rx);

        let reporter_token = CancellationToken::new();
        let reporter = config.stats_interval.filter(|i| !i.is_zero()).map(|interval| {
            tokio::spawn(crate::stats::report(
                Arc::clone(&stats),
                tracker.clone(),
                interval,
                reporter_token.clone(),
            ))
        });

        tracing::info!(
            root = %config.root.display(),
            extract_workers = config.extract_workers,
            load_workers = config.load_workers,
            "starting migration"
        );

        let discovery = {
            let walker = Discovery::new(config.root.clone(), config.filter.clone());
            let tracker = tracker.clone();
            let stats = Arc::clone(&stats);
            tokio::task::spawn_blocking(move || {
                walker.run(&stats, |unit| {
                    // recorded before the hand-off, so its completion can never overtake it
                    if tracker.record(unit.clone()).is_err() {
                        return false;
                    }
                    unit_tx.blocking_send(unit).is_ok()
                })
            })
        };

        let drain = {
            let exit = exit.clone();
            async move {
                let summary = match discovery.await {
                    Ok(Ok(summary)) => Some(summary),
                    Ok(Err(e)) => {
                        exit.fail(e);
                        None
                    }
                    Err(e) => {
                        exit.fail(MigrateError::Discovery(e.to_string()));
                        None
                    }
                };
                tracing::debug!("discovery done, waiting for extract workers");
                join_all(&mut extract, "extract").await?;
                tracing::debug!("extract workers done, waiting for load workers");
                join_all(&mut load, "load").await?;
                Ok::<_, PipelineError>(summary)
            }
        };

        let drained = tokio::select! {
            biased;
            () = exit.requested() => None,
            result = drain => Some(result?),
        };

        reporter_token.cancel();
        if let Some(reporter) = reporter {
            // the reporter only logs, a failure here does not change the outcome
            let _ = reporter.await;
        }

        match (drained, exit.code()) {
            (Some(Some(discovery)), None) => {
                drop(exit);
                drop(tracker);
                let report = tracker_task.await.map_err(|source| PipelineError::Join {
                    task: "tracker",
                    source,
                })?;
                let abandoned = match report {
                    TrackerReport::Drained { remaining } => remaining,
                    TrackerReport::Aborted { resume, .. } => resume.into_iter().collect(),
                };
                for unit in &abandoned {
                    tracing::warn!(path = %unit, "unit was never written, migrate it manually");
                }
                let stats = stats.snapshot();
                tracing::info!(
                    discovered = discovery.emitted,
                    written = stats.batches_written,
                    points = stats.points_written,
                    abandoned = abandoned.len(),
                    "migration complete"
                );
                Ok(Outcome::Completed {
                    discovery,
                    abandoned,
                    stats,
                })
            }
            (_, code) => {
                let code = code.unwrap_or(crate::FATAL);
                let resume = resume_point(tracker_task, config.exit_grace).await;
                Ok(Outcome::Aborted {
                    code,
                    resume,
                    cause: exit.take_cause(),
                    stats: stats.snapshot(),
                })
            }
        }
    }
}

/// Waits up to `grace` for the tracker's report and returns its head.
async fn resume_point(
    tracker_task: JoinHandle<TrackerReport>,
    grace: Duration,
) -> Option<WorkUnit> {
    match tokio::time::timeout(grace, tracker_task).await {
        Ok(Ok(TrackerReport::Aborted { resume, .. })) => resume,
        Ok(Ok(TrackerReport::Drained { remaining })) => remaining.into_iter().next(),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "tracker failed, no resume point");
            None
        }
        Err(_) => {
            tracing::warn!(
                grace_ms = grace.as_millis() as u64,
                "tracker did not report in time, no resume point"
            );
            None
        }
    }
}

async fn join_all(set: &mut JoinSet<()>, task: &'static str) -> Result<(), PipelineError> {
    while let Some(result) = set.join_next().await {
        result.map_err(|source| PipelineError::Join { task, source })?;
    }
    Ok(())
}
