//! Pipeline error types.

use thiserror::Error;

/// Errors raised by the pipeline machinery itself, as opposed to the
/// per-unit failures handled inside the stages.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The tracker task has stopped and no longer accepts messages.
    #[error("in-progress tracker is no longer running")]
    TrackerGone,

    /// A pipeline task panicked or was cancelled unexpectedly.
    #[error("{task} task failed: {source}")]
    Join {
        /// Which task failed.
        task: &'static str,
        /// Underlying join error.
        #[source]
        source: tokio::task::JoinError,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}
