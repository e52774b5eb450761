//! Single-active-stream discipline for one chat surface.

use std::sync::Mutex;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Cancellation reason for a stream replaced by a newer submission.
pub const REASON_NEW_SUBMISSION: &str = "New submission started";
/// Cancellation reason when the selected app (or session) changes.
pub const REASON_APP_CHANGED: &str = "Selected app changed";
/// Cancellation reason when the chat surface goes away.
pub const REASON_UNMOUNT: &str = "Component unmounting";

/// Lifecycle of the most recent stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Idle,
    Active,
    Completed,
    Cancelled(String),
    Failed(String),
}

impl StreamStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, StreamStatus::Active)
    }
}

/// Token and identity of one started stream.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    pub frontend_invocation_id: String,
    pub token: CancellationToken,
}

struct ActiveStream {
    frontend_invocation_id: String,
    token: CancellationToken,
}

/// Holds at most one active stream and its cancellation token.
///
/// Starting a stream cancels whichever one is in flight. Only the stream
/// that is still current may report its final status; a replaced stream's
/// late completion is ignored.
pub struct StreamController {
    current: Mutex<Option<ActiveStream>>,
    status: watch::Sender<StreamStatus>,
}

impl StreamController {
    pub fn new() -> Self {
        let (status, _) = watch::channel(StreamStatus::Idle);
        Self {
            current: Mutex::new(None),
            status,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StreamStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> StreamStatus {
        self.status.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ActiveStream>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cancels the in-flight stream, if any. Returns whether one was cancelled.
    pub fn cancel(&self, reason: &str) -> bool {
        let Some(active) = self.lock().take() else {
            return false;
        };
        active.token.cancel();
        tracing::info!(
            "[SSE] Cancelled stream {}: {}",
            active.frontend_invocation_id,
            reason
        );
        self.status
            .send_replace(StreamStatus::Cancelled(reason.to_string()));
        true
    }

    /// Cancels any in-flight stream with `reason` and registers a new one.
    pub fn begin(&self, frontend_invocation_id: &str, reason: &str) -> StreamHandle {
        let token = CancellationToken::new();
        let previous = self.lock().replace(ActiveStream {
            frontend_invocation_id: frontend_invocation_id.to_string(),
            token: token.clone(),
        });

        if let Some(previous) = previous {
            previous.token.cancel();
            tracing::info!(
                "[SSE] Cancelled stream {}: {}",
                previous.frontend_invocation_id,
                reason
            );
        }

        self.status.send_replace(StreamStatus::Active);
        StreamHandle {
            frontend_invocation_id: frontend_invocation_id.to_string(),
            token,
        }
    }

    /// Records the final status of `handle` if it is still the current stream.
    pub fn finish(&self, handle: &StreamHandle, status: StreamStatus) {
        let mut current = self.lock();
        let is_current = current
            .as_ref()
            .is_some_and(|active| active.frontend_invocation_id == handle.frontend_invocation_id);
        if !is_current {
            tracing::debug!(
                "[SSE] Stream {} already replaced; final status {:?} dropped",
                handle.frontend_invocation_id,
                status
            );
            return;
        }
        *current = None;
        drop(current);
        self.status.send_replace(status);
    }
}

impl Default for StreamController {
    fn default() -> Self {
        Self::new()
    }
}
