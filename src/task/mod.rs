//! Background work owned by a single step.
//!
//! A step starts at most one task at a time through the flow's
//! [`TaskScheduler`]. The work itself runs on whatever [`TaskExecutor`] the
//! flow was built with; its outcome travels back over a channel and is only
//! handed to the owning step when the flow drains completions on the control
//! thread. Canceling a [`TaskHandle`] before that point guarantees the
//! outcome is never delivered.

mod manual;
mod tokio_executor;

pub use manual::ManualExecutor;
pub use tokio_executor::TokioExecutor;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Identifier of a scheduled task, unique within one scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// How a task's work finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success,
    Failure(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Work executed off the control thread
pub type TaskWork = Box<dyn FnOnce() -> TaskOutcome + Send + 'static>;

const PENDING: u8 = 0;
const COMPLETED: u8 = 1;
const CANCELED: u8 = 2;

/// Shared view of a task's lifecycle.
///
/// The state only ever moves out of pending once, either to completed (when
/// the scheduler delivers the outcome) or to canceled.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    state: Arc<AtomicU8>,
}

impl TaskHandle {
    fn new(id: TaskId) -> Self {
        Self {
            id,
            state: Arc::new(AtomicU8::new(PENDING)),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }

    pub fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMPLETED
    }

    pub fn is_canceled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELED
    }

    /// Cancel the task if it has not completed yet.
    ///
    /// Returns true when this call moved the task to canceled. Work that has
    /// already started keeps running, but its outcome is dropped.
    pub fn cancel(&self) -> bool {
        let canceled = self
            .state
            .compare_exchange(PENDING, CANCELED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if canceled {
            tracing::debug!(task = %self.id, "task canceled");
        }
        canceled
    }

    fn complete(&self) -> bool {
        self.state
            .compare_exchange(PENDING, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Outcome reported by an executor, not yet delivered to a step
#[derive(Debug)]
pub struct Completion {
    pub id: TaskId,
    pub outcome: TaskOutcome,
}

/// A unit of work handed to an executor
pub struct ScheduledJob {
    handle: TaskHandle,
    delay: Duration,
    work: TaskWork,
    done: UnboundedSender<Completion>,
}

impl ScheduledJob {
    pub fn id(&self) -> TaskId {
        self.handle.id
    }

    /// How long the executor should wait before running the work
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_canceled(&self) -> bool {
        self.handle.is_canceled()
    }

    /// Run the work and report its outcome. Skips the work entirely if the
    /// task was canceled before it got here.
    pub fn run(self) {
        if self.handle.is_canceled() {
            tracing::trace!(task = %self.handle.id, "skipping canceled task");
            return;
        }

        let outcome = (self.work)();
        tracing::trace!(task = %self.handle.id, ?outcome, "task work finished");

        // The scheduler may be gone already (flow dropped); nothing to report to.
        let _ = self.done.send(Completion {
            id: self.handle.id,
            outcome,
        });
    }
}

impl fmt::Debug for ScheduledJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledJob")
            .field("id", &self.handle.id)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// Somewhere to run task work
pub trait TaskExecutor: Send + Sync {
    fn schedule(&self, job: ScheduledJob);
}

/// Control-thread side of the task boundary.
///
/// Each started task is remembered with a `target` describing who gets the
/// outcome. [`TaskScheduler::drain`] returns every outcome whose task was
/// still pending, exactly once.
pub struct TaskScheduler<T> {
    executor: Arc<dyn TaskExecutor>,
    sender: UnboundedSender<Completion>,
    receiver: UnboundedReceiver<Completion>,
    next_id: u64,
    pending: HashMap<TaskId, (TaskHandle, T)>,
}

impl<T> TaskScheduler<T> {
    pub fn new(executor: Arc<dyn TaskExecutor>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            executor,
            sender,
            receiver,
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    /// Schedule `work` to run after `delay`; its outcome will be reported for `target`
    pub fn start(&mut self, delay: Duration, work: TaskWork, target: T) -> TaskHandle {
        let id = TaskId(self.next_id);
        self.next_id += 1;

        let handle = TaskHandle::new(id);
        self.pending.insert(id, (handle.clone(), target));

        tracing::debug!(task = %id, delay_ms = delay.as_millis() as u64, "task scheduled");
        self.executor.schedule(ScheduledJob {
            handle: handle.clone(),
            delay,
            work,
            done: self.sender.clone(),
        });

        handle
    }

    /// Take the next outcome of a task that finished and was not canceled.
    /// Later outcomes stay queued until asked for.
    pub fn next_outcome(&mut self) -> Option<(T, TaskOutcome)> {
        while let Ok(completion) = self.receiver.try_recv() {
            let Some((handle, target)) = self.pending.remove(&completion.id) else {
                continue;
            };
            if handle.complete() {
                return Some((target, completion.outcome));
            }
            tracing::debug!(task = %completion.id, "dropping outcome of canceled task");
        }

        self.pending.retain(|_, (handle, _)| handle.is_pending());
        None
    }

    /// Collect outcomes of tasks that finished and were not canceled
    pub fn drain(&mut self) -> Vec<(T, TaskOutcome)> {
        std::iter::from_fn(|| self.next_outcome()).collect()
    }

    /// Number of tasks still waiting on an outcome
    pub fn pending_count(&self) -> usize {
        self.pending
            .values()
            .filter(|(handle, _)| handle.is_pending())
            .count()
    }
}

impl<T: PartialEq> TaskScheduler<T> {
    /// Whether a task started for `target` is still pending
    pub fn has_pending(&self, target: &T) -> bool {
        self.pending
            .values()
            .any(|(handle, owner)| owner == target && handle.is_pending())
    }
}
