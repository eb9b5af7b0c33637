//! Delayed-task abstraction used by the gesture engine.
//!
//! The engine never sleeps.  It asks a [`Scheduler`] to run a closure after a
//! delay and keeps the returned [`TaskHandle`] in the button's single pending
//! slot.  Dropping or cancelling the handle guarantees the closure will not
//! start afterwards.
//!
//! Two implementations exist:
//!
//! - the daemon's tokio-backed scheduler (real time), and
//! - [`ManualScheduler`] here, a virtual clock that only moves when a test
//!   calls [`ManualScheduler::advance`].  It makes every timing property of
//!   the engine checkable without sleeping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks after a delay on some background context.
///
/// `schedule` must not run `task` synchronously: the engine calls it while
/// holding its state lock.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle;
}

/// Cancellation handle for one scheduled task.  Cancels on drop.
#[derive(Debug)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    /// Creates a handle and the flag the scheduler must check before running.
    pub fn pair() -> (Self, Arc<AtomicBool>) {
        let cancelled = Arc::new(AtomicBool::new(false));
        (
            Self {
                cancelled: Arc::clone(&cancelled),
            },
            cancelled,
        )
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ── ManualScheduler ───────────────────────────────────────────────────────────

struct Queued {
    due: Duration,
    seq: u64,
    cancelled: Arc<AtomicBool>,
    task: Task,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    seq: u64,
    queue: Vec<Queued>,
}

/// Deterministic scheduler driven by an explicit virtual clock.
///
/// Tasks due at the same instant run in scheduling order.  A task that
/// schedules another task during [`advance`](Self::advance) sees it run in
/// the same call if it falls due before the advance target.
pub struct ManualScheduler {
    origin: Instant,
    clock: Mutex<Clock>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            clock: Mutex::new(Clock::default()),
        }
    }

    /// Virtual time since construction.
    pub fn elapsed(&self) -> Duration {
        self.lock().now
    }

    /// The current virtual instant, for timestamping presses.
    pub fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    /// Number of scheduled tasks that are neither run nor cancelled.
    pub fn pending(&self) -> usize {
        self.lock()
            .queue
            .iter()
            .filter(|q| !q.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Moves the clock forward by `by`, running every task that falls due.
    pub fn advance(&self, by: Duration) {
        let target = self.elapsed() + by;
        loop {
            let next = {
                let mut clock = self.lock();
                clock.queue.retain(|q| !q.cancelled.load(Ordering::SeqCst));
                let index = clock
                    .queue
                    .iter()
                    .enumerate()
                    .filter(|(_, q)| q.due <= target)
                    .min_by_key(|(_, q)| (q.due, q.seq))
                    .map(|(i, _)| i);
                match index {
                    Some(i) => {
                        let queued = clock.queue.swap_remove(i);
                        clock.now = queued.due;
                        Some(queued)
                    }
                    None => None,
                }
            };
            match next {
                Some(queued) => {
                    if !queued.cancelled.load(Ordering::SeqCst) {
                        (queued.task)();
                    }
                }
                None => break,
            }
        }
        self.lock().now = target;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let (handle, cancelled) = TaskHandle::pair();
        let mut clock = self.lock();
        let due = clock.now + delay;
        let seq = clock.seq;
        clock.seq += 1;
        clock.queue.push(Queued {
            due,
            seq,
            cancelled,
            task,
        });
        handle
    }
}
