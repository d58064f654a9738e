//! Load workers: series conversion and destination writes.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};
use whisperflux_types::{MigrateError, PointBatch, PointWriter, Series};

use crate::discovery::ARCHIVE_SUFFIX;
use crate::{ExitSignal, Stats, TrackerHandle, WriteFailurePolicy};

/// Derives the measurement name of an archive.
///
/// The root is stripped, the `.wsp` suffix dropped, and path components
/// joined with `.`, then `prefix` is prepended as given.
///
/// ```
/// # use std::path::Path;
/// # use whisperflux_pipeline::measurement_name;
/// let name = measurement_name(
///     Path::new("/opt/graphite/storage/whisper"),
///     Path::new("/opt/graphite/storage/whisper/servers/web1/load.wsp"),
///     "graphite.",
/// );
/// assert_eq!(name, "graphite.servers.web1.load");
/// ```
#[must_use]
pub fn measurement_name(root: &Path, path: &Path, prefix: &str) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".");
    let base = joined.strip_suffix(ARCHIVE_SUFFIX).unwrap_or(&joined);
    format!("{prefix}{base}")
}

/// One member of the load pool.
#[derive(Debug)]
pub(crate) struct LoadWorker<W> {
    pub(crate) id: usize,
    pub(crate) writer: Arc<W>,
    pub(crate) batches: Arc<Mutex<mpsc::Receiver<PointBatch>>>,
    pub(crate) tracker: TrackerHandle,
    pub(crate) exit: ExitSignal,
    pub(crate) policy: WriteFailurePolicy,
    pub(crate) root: PathBuf,
    pub(crate) prefix: String,
    pub(crate) stats: Arc<Stats>,
}

impl<W: PointWriter> LoadWorker<W> {
    /// Writes batches until the batch queue closes or a write fails fatally.
    pub(crate) async fn run(self) {
        loop {
            let Some(batch) = self.batches.lock().await.recv().await else {
                break;
            };
            let PointBatch { unit, points } = batch;

            if points.is_empty() {
                tracing::debug!(worker = self.id, path = %unit, "no points to write");
                Stats::incr(&self.stats.empty_batches);
            } else {
                let series = Series::new(
                    measurement_name(&self.root, unit.path(), &self.prefix),
                    points,
                );
                let started = Instant::now();
                if !self.write(&series).await {
                    return;
                }
                let elapsed = started.elapsed();

                self.stats.influx_write.record(elapsed);
                Stats::incr(&self.stats.batches_written);
                self.stats
                    .points_written
                    .fetch_add(series.len() as u64, Ordering::Relaxed);
                tracing::debug!(
                    worker = self.id,
                    measurement = %series.name,
                    points = series.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "committed {series}"
                );
            }

            if self.tracker.complete(unit).is_err() {
                break;
            }
        }
        tracing::trace!(worker = self.id, "load worker done");
    }

    /// Writes `series` under the failure policy. Returns false if the write
    /// was given up and exit requested.
    async fn write(&self, series: &Series) -> bool {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let started = Instant::now();
            let error = match self.writer.write(series).await {
                Ok(()) => return true,
                Err(e) => e,
            };
            tracing::warn!(
                worker = self.id,
                measurement = %series.name,
                attempt,
                error = %error,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "failed to write {series}"
            );

            match self.policy {
                WriteFailurePolicy::Abort => {
                    self.exit.fail(MigrateError::Write {
                        measurement: series.name.clone(),
                        message: error.to_string(),
                    });
                    return false;
                }
                WriteFailurePolicy::Retry {
                    max_attempts,
                    backoff,
                } => {
                    if max_attempts.is_some_and(|max| attempt >= max) {
                        self.exit.fail(MigrateError::Write {
                            measurement: series.name.clone(),
                            message: format!("giving up after {attempt} attempts: {error}"),
                        });
                        return false;
                    }
                    Stats::incr(&self.stats.write_retries);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
