//! Process-wide exit signal.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio_util::sync::CancellationToken;
use whisperflux_types::MigrateError;

use crate::TrackerHandle;

/// Exit status for every fatal error path.
pub const FATAL: i32 = 2;

#[derive(Debug)]
struct Inner {
    code: OnceLock<i32>,
    cause: Mutex<Option<MigrateError>>,
    token: CancellationToken,
}

/// Shared termination request.
///
/// Any stage may request exit; the first request wins and later ones are
/// ignored. The winning code is queued to the tracker before the token
/// fires, so the tracker sees it in order with every record and completion
/// sent before it.
#[derive(Debug, Clone)]
pub struct ExitSignal {
    inner: Arc<Inner>,
    tracker: TrackerHandle,
}

impl ExitSignal {
    /// Creates a signal that reports to `tracker`.
    #[must_use]
    pub fn new(tracker: TrackerHandle) -> Self {
        Self {
            inner: Arc::new(Inner {
                code: OnceLock::new(),
                cause: Mutex::new(None),
                token: CancellationToken::new(),
            }),
            tracker,
        }
    }

    /// Requests termination with `code`. Returns true if this call won.
    pub fn request(&self, code: i32) -> bool {
        if self.inner.code.set(code).is_err() {
            return false;
        }
        if self.tracker.exit(code).is_err() {
            tracing::warn!(code, "tracker already stopped, no resume point available");
        }
        self.inner.token.cancel();
        true
    }

    /// Logs `cause` and requests termination with [`FATAL`].
    ///
    /// The cause is kept only if this call wins.
    pub fn fail(&self, cause: MigrateError) -> bool {
        tracing::error!(error = %cause, "fatal error");
        let mut slot = self
            .inner
            .cause
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let won = self.request(FATAL);
        if won {
            *slot = Some(cause);
        }
        won
    }

    /// The winning exit code, if exit has been requested.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        self.inner.code.get().copied()
    }

    /// Returns true once exit has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Completes once exit has been requested.
    pub async fn requested(&self) {
        self.inner.token.cancelled().await;
    }

    /// Takes the error that caused the exit, if it was raised through [`fail`](Self::fail).
    pub fn take_cause(&self) -> Option<MigrateError> {
        self.inner
            .cause
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
