//! Executor backed by the tokio runtime

use tokio::runtime::Handle;

use super::{ScheduledJob, TaskExecutor};

/// Runs task work on a tokio runtime.
///
/// The delay is a `tokio::time::sleep`; the work itself goes through
/// `spawn_blocking` since it is a plain closure that may block.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    runtime: Handle,
}

impl TokioExecutor {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Executor for the runtime the caller is running on.
    ///
    /// Panics when called outside a tokio runtime, like `Handle::current`.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl TaskExecutor for TokioExecutor {
    fn schedule(&self, job: ScheduledJob) {
        self.runtime.spawn(async move {
            tokio::time::sleep(job.delay()).await;
            if job.is_canceled() {
                tracing::trace!(task = %job.id(), "task canceled while waiting");
                return;
            }
            if let Err(err) = tokio::task::spawn_blocking(move || job.run()).await {
                tracing::warn!(error = %err, "task work panicked");
            }
        });
    }
}
