//! In-progress tracking and resume-point reporting.
//!
//! Workers finish out of discovery order, so "the last unit written" is not
//! a safe place to resume from. The tracker keeps every unit between
//! discovery and load completion, ordered by discovery, and on abort reports
//! the oldest one. Everything discovered before it has been written.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use whisperflux_types::WorkUnit;

use crate::PipelineError;

/// Units between discovery and completion, in discovery order.
#[derive(Debug, Default)]
pub struct InProgress {
    next_seq: u64,
    by_seq: BTreeMap<u64, WorkUnit>,
    index: HashMap<WorkUnit, u64>,
}

impl InProgress {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `unit` at the tail.
    ///
    /// Returns false, leaving the sequence unchanged, if the unit is
    /// already present.
    pub fn record(&mut self, unit: WorkUnit) -> bool {
        if self.index.contains_key(&unit) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(unit.clone(), seq);
        self.by_seq.insert(seq, unit);
        true
    }

    /// Removes `unit` wherever it sits. Returns false if it was not present.
    pub fn complete(&mut self, unit: &WorkUnit) -> bool {
        match self.index.remove(unit) {
            Some(seq) => {
                self.by_seq.remove(&seq);
                true
            }
            None => false,
        }
    }

    /// The oldest unfinished unit.
    #[must_use]
    pub fn head(&self) -> Option<&WorkUnit> {
        self.by_seq.values().next()
    }

    /// Number of units in progress.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_seq.len()
    }

    /// Returns true if nothing is in progress.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_seq.is_empty()
    }

    /// Iterates units in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkUnit> {
        self.by_seq.values()
    }

    /// Consumes the sequence, returning units in discovery order.
    #[must_use]
    pub fn into_units(self) -> Vec<WorkUnit> {
        self.by_seq.into_values().collect()
    }
}

/// Point-in-time view of the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The oldest unfinished unit.
    pub head: Option<WorkUnit>,
    /// Number of units in progress.
    pub in_progress: usize,
}

/// How the tracker stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerReport {
    /// Every sender went away. `remaining` holds units that were discovered
    /// but never completed, in discovery order.
    Drained {
        /// Units left in progress.
        remaining: Vec<WorkUnit>,
    },
    /// An exit was requested.
    Aborted {
        /// Requested exit status.
        code: i32,
        /// Safe resume point, if anything was in progress.
        resume: Option<WorkUnit>,
    },
}

#[derive(Debug)]
enum TrackerMsg {
    Record(WorkUnit),
    Complete(WorkUnit),
    Exit(i32),
    Snapshot(oneshot::Sender<Snapshot>),
}

/// Sending side of the tracker's message queue.
///
/// All messages share one FIFO queue, so a unit recorded before it is handed
/// to the extract pool is always recorded before it can be completed.
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    tx: mpsc::UnboundedSender<TrackerMsg>,
}

impl TrackerHandle {
    /// Records a newly discovered unit.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TrackerGone`] if the tracker has stopped.
    pub fn record(&self, unit: WorkUnit) -> Result<(), PipelineError> {
        self.send(TrackerMsg::Record(unit))
    }

    /// Reports that a unit has been written.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TrackerGone`] if the tracker has stopped.
    pub fn complete(&self, unit: WorkUnit) -> Result<(), PipelineError> {
        self.send(TrackerMsg::Complete(unit))
    }

    /// Asks the tracker to report its head and stop.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TrackerGone`] if the tracker has stopped.
    pub fn exit(&self, code: i32) -> Result<(), PipelineError> {
        self.send(TrackerMsg::Exit(code))
    }

    /// Queries the head and size of the in-progress sequence.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TrackerGone`] if the tracker has stopped.
    pub async fn snapshot(&self) -> Result<Snapshot, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.send(TrackerMsg::Snapshot(reply))?;
        rx.await.map_err(|_| PipelineError::TrackerGone)
    }

    fn send(&self, msg: TrackerMsg) -> Result<(), PipelineError> {
        self.tx.send(msg).map_err(|_| PipelineError::TrackerGone)
    }
}

/// Spawns the tracker task.
///
/// The task ends on the first exit request, or once every handle has been
/// dropped.
pub fn spawn_tracker() -> (TrackerHandle, JoinHandle<TrackerReport>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(rx));
    (TrackerHandle { tx }, task)
}

async fn run(mut rx: mpsc::UnboundedReceiver<TrackerMsg>) -> TrackerReport {
    let mut in_progress = InProgress::new();

    while let Some(msg) = rx.recv().await {
        match msg {
            TrackerMsg::Record(unit) => {
                if !in_progress.record(unit.clone()) {
                    tracing::warn!(path = %unit, "unit recorded twice, keeping first position");
                }
            }
            TrackerMsg::Complete(unit) => {
                if !in_progress.complete(&unit) {
                    tracing::warn!(path = %unit, "completion for unknown unit ignored");
                }
            }
            TrackerMsg::Exit(code) => {
                let resume = in_progress.head().cloned();
                tracing::debug!(code, resume = ?resume, "tracker stopping on exit request");
                return TrackerReport::Aborted { code, resume };
            }
            TrackerMsg::Snapshot(reply) => {
                let _ = reply.send(Snapshot {
                    head: in_progress.head().cloned(),
                    in_progress: in_progress.len(),
                });
            }
        }
    }

    TrackerReport::Drained {
        remaining: in_progress.into_units(),
    }
}
