//! Extract workers: archive reads.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, mpsc};
use whisperflux_types::{
    ArchiveHandle, ArchiveSource, MigrateError, PointBatch, ReadMode, WorkUnit,
};

use crate::{ExitSignal, ReadFailurePolicy, Stats};

/// Reads the points of one unit.
///
/// In full mode every archive is dumped coarsest first, so finer values
/// for the same timestamp come later and win when written. Sentinel slots
/// are dropped either way.
///
/// # Errors
///
/// Returns the source's error if the archive cannot be opened or read.
pub fn read_unit<S: ArchiveSource>(
    source: &S,
    unit: &WorkUnit,
    mode: ReadMode,
) -> Result<PointBatch, <S::Handle as ArchiveHandle>::Error> {
    let mut handle = source.open(unit.path())?;
    let points = match mode {
        ReadMode::Range(range) => handle.fetch(range)?,
        ReadMode::Full => {
            let mut points = Vec::with_capacity(handle.point_capacity());
            for index in (0..handle.archive_count()).rev() {
                points.extend(handle.dump_archive(index)?);
            }
            points
        }
    };
    Ok(PointBatch::new(unit.clone(), points))
}

/// One member of the extract pool.
#[derive(Debug)]
pub(crate) struct ExtractWorker<S> {
    pub(crate) id: usize,
    pub(crate) source: Arc<S>,
    pub(crate) mode: ReadMode,
    pub(crate) policy: ReadFailurePolicy,
    pub(crate) units: Arc<Mutex<mpsc::Receiver<WorkUnit>>>,
    pub(crate) batches: mpsc::Sender<PointBatch>,
    pub(crate) exit: ExitSignal,
    pub(crate) stats: Arc<Stats>,
}

impl<S: ArchiveSource> ExtractWorker<S> {
    /// Reads units until the work queue closes, the batch queue closes, or
    /// a fatal read failure.
    pub(crate) async fn run(self) {
        loop {
            let Some(unit) = self.units.lock().await.recv().await else {
                break;
            };

            let source = Arc::clone(&self.source);
            let mode = self.mode;
            let target = unit.clone();
            let started = Instant::now();
            let result =
                tokio::task::spawn_blocking(move || read_unit(source.as_ref(), &target, mode))
                    .await;
            let elapsed = started.elapsed();

            let batch = match result {
                Ok(Ok(batch)) => batch,
                Ok(Err(e)) => {
                    if self.on_failure(&unit, e.to_string(), elapsed) {
                        continue;
                    }
                    return;
                }
                Err(e) => {
                    if self.on_failure(&unit, e.to_string(), elapsed) {
                        continue;
                    }
                    return;
                }
            };

            self.stats.whisper_read.record(elapsed);
            tracing::trace!(
                worker = self.id,
                path = %unit,
                points = batch.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "read archive"
            );

            if self.batches.send(batch).await.is_err() {
                break;
            }
        }
        tracing::trace!(worker = self.id, "extract worker done");
    }

    /// Applies the read-failure policy. Returns true if the worker should
    /// carry on with the next unit.
    fn on_failure(&self, unit: &WorkUnit, message: String, elapsed: Duration) -> bool {
        match self.policy {
            ReadFailurePolicy::Skip => {
                tracing::warn!(
                    worker = self.id,
                    path = %unit,
                    error = %message,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "failed to read archive, skipping"
                );
                Stats::incr(&self.stats.read_failures);
                true
            }
            ReadFailurePolicy::Abort => {
                self.exit.fail(MigrateError::Read {
                    path: unit.to_string(),
                    message,
                });
                false
            }
        }
    }
}
