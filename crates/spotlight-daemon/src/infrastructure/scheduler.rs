//! Real-time [`Scheduler`] backed by the tokio runtime.
//!
//! Each scheduled task becomes a small tokio task that sleeps, checks the
//! cancellation flag, then runs the closure on a runtime worker.  Reader
//! threads are plain OS threads, so the scheduler keeps a runtime
//! [`Handle`] instead of relying on `tokio::spawn`'s thread-local context.

use std::sync::atomic::Ordering;
use std::time::Duration;

use spotlight_core::gesture::{Scheduler, Task, TaskHandle};
use tokio::runtime::Handle;

#[derive(Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let (handle, cancelled) = TaskHandle::pair();
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if !cancelled.load(Ordering::SeqCst) {
                task();
            }
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_task_runs_after_delay() {
        // Arrange
        let sched = TokioScheduler::current();
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Act
        let _handle = sched.schedule(
            Duration::from_millis(300),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        tokio::time::sleep(Duration::from_millis(299)).await;
        let early = rx.try_recv();
        let fired = tokio::time::timeout(Duration::from_millis(10), rx.recv()).await;

        // Assert
        assert!(early.is_err());
        assert_eq!(fired.ok().flatten(), Some(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_cancels_task() {
        // Arrange
        let sched = TokioScheduler::current();
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        // Act
        let handle = sched.schedule(
            Duration::from_millis(100),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        drop(handle);
        let fired = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;

        // Assert
        // The closure was dropped unrun, closing the channel.
        assert_eq!(fired.ok().flatten(), None);
    }
}
