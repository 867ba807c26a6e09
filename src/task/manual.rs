//! Deterministic executor driven by a simulated clock

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{ScheduledJob, TaskExecutor};

struct Queued {
    due: Duration,
    seq: u64,
    job: ScheduledJob,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    seq: u64,
    queue: Vec<Queued>,
}

/// Executor that only runs work when told to.
///
/// Jobs wait until [`ManualExecutor::advance`] moves the simulated clock past
/// their delay, then run inline on the calling thread in the order they
/// became due. Used by tests and by the headless `walk` runner.
#[derive(Default)]
pub struct ManualExecutor {
    clock: Mutex<ManualClock>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn clock(&self) -> MutexGuard<'_, ManualClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current simulated time since the executor was created
    pub fn now(&self) -> Duration {
        self.clock().now
    }

    /// Number of jobs waiting for the clock
    pub fn scheduled(&self) -> usize {
        self.clock().queue.len()
    }

    /// Move the clock forward and run every job that became due.
    ///
    /// Returns how many jobs were taken off the queue, including canceled
    /// ones that were skipped.
    pub fn advance(&self, by: Duration) -> usize {
        let mut due = {
            let mut clock = self.clock();
            clock.now += by;
            let now = clock.now;
            let (due, waiting): (Vec<_>, Vec<_>) =
                clock.queue.drain(..).partition(|queued| queued.due <= now);
            clock.queue = waiting;
            due
        };
        due.sort_by_key(|queued| (queued.due, queued.seq));

        let count = due.len();
        // Run outside the lock so work may schedule more jobs.
        for queued in due {
            queued.job.run();
        }
        count
    }
}

impl TaskExecutor for ManualExecutor {
    fn schedule(&self, job: ScheduledJob) {
        let mut clock = self.clock();
        let due = clock.now + job.delay();
        let seq = clock.seq;
        clock.seq += 1;
        clock.queue.push(Queued { due, seq, job });
    }
}
