//! Run counters and duration timers.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::TrackerHandle;

/// Summary of a [`Timer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerSnapshot {
    /// Number of recorded durations.
    pub count: u64,
    /// Shortest recorded duration.
    pub min: Duration,
    /// Mean of recorded durations.
    pub mean: Duration,
    /// Longest recorded duration.
    pub max: Duration,
}

#[derive(Debug, Default)]
struct TimerState {
    count: u64,
    total: Duration,
    min: Duration,
    max: Duration,
}

/// Records durations of a repeated operation.
#[derive(Debug, Default)]
pub struct Timer {
    state: Mutex<TimerState>,
}

impl Timer {
    /// Records one duration.
    pub fn record(&self, elapsed: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.count == 0 || elapsed < state.min {
            state.min = elapsed;
        }
        if elapsed > state.max {
            state.max = elapsed;
        }
        state.count += 1;
        state.total += elapsed;
    }

    /// Returns count, min, mean and max so far.
    #[must_use]
    pub fn snapshot(&self) -> TimerSnapshot {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mean = if state.count == 0 {
            Duration::ZERO
        } else {
            let nanos = state.total.as_nanos() / u128::from(state.count);
            Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
        };
        TimerSnapshot {
            count: state.count,
            min: state.min,
            mean,
            max: state.max,
        }
    }
}

/// Counters and timers shared by every stage of a run.
#[derive(Debug, Default)]
pub struct Stats {
    pub(crate) discovered: AtomicU64,
    pub(crate) suppressed: AtomicU64,
    pub(crate) read_failures: AtomicU64,
    pub(crate) batches_written: AtomicU64,
    pub(crate) empty_batches: AtomicU64,
    pub(crate) points_written: AtomicU64,
    pub(crate) write_retries: AtomicU64,
    pub(crate) whisper_read: Timer,
    pub(crate) influx_write: Timer,
}

/// Point-in-time copy of [`Stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Units handed to the extract pool.
    pub discovered: u64,
    /// Units suppressed by the skip cursor.
    pub suppressed: u64,
    /// Archives that could not be read.
    pub read_failures: u64,
    /// Series written to the destination.
    pub batches_written: u64,
    /// Units completed without a write because no points were in range.
    pub empty_batches: u64,
    /// Points sent to the destination.
    pub points_written: u64,
    /// Failed write attempts that were retried.
    pub write_retries: u64,
    /// Archive read durations.
    pub whisper_read: TimerSnapshot,
    /// Destination write durations.
    pub influx_write: TimerSnapshot,
}

impl Stats {
    /// Creates zeroed stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies every counter and timer.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            discovered: self.discovered.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            empty_batches: self.empty_batches.load(Ordering::Relaxed),
            points_written: self.points_written.load(Ordering::Relaxed),
            write_retries: self.write_retries.load(Ordering::Relaxed),
            whisper_read: self.whisper_read.snapshot(),
            influx_write: self.influx_write.snapshot(),
        }
    }
}

impl StatsSnapshot {
    /// Units that have left the pipeline one way or another.
    #[must_use]
    pub const fn finished(&self) -> u64 {
        self.batches_written + self.empty_batches + self.read_failures
    }
}

/// Logs a stats line every `interval` until `token` fires.
pub(crate) async fn report(
    stats: std::sync::Arc<Stats>,
    tracker: TrackerHandle,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let s = stats.snapshot();
        let in_progress = match tracker.snapshot().await {
            Ok(snapshot) => snapshot.in_progress,
            Err(_) => break,
        };
        tracing::info!(
            target: "whisperflux::stats",
            discovered = s.discovered,
            suppressed = s.suppressed,
            in_progress,
            read_failures = s.read_failures,
            batches_written = s.batches_written,
            empty_batches = s.empty_batches,
            points_written = s.points_written,
            write_retries = s.write_retries,
            "progress"
        );
        for (name, timer) in [("whisper_read", s.whisper_read), ("influx_write", s.influx_write)] {
            tracing::info!(
                target: "whisperflux::stats",
                timer = name,
                count = timer.count,
                min_ms = timer.min.as_millis() as u64,
                mean_ms = timer.mean.as_millis() as u64,
                max_ms = timer.max.as_millis() as u64,
                "timer"
            );
        }
    }
}
