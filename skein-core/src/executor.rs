//! Task executor with in-flight accounting.
//!
//! The broker counts every drain and delivery as a unit of work, whether it
//! runs as a task of its own or queued into a long-lived worker loop. This
//! executor wraps `tokio::spawn` with a shared in-flight counter so callers
//! can await quiescence, the moment no delivery work remains. Tests and
//! graceful shutdown use this in place of ad-hoc sleeps.

use std::future::Future;
use std::pin::pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Handle for spawning immediate or delayed work items.
///
/// Cheap to clone; clones share the same in-flight accounting.
#[derive(Debug, Clone, Default)]
pub struct TaskExecutor {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    in_flight: AtomicUsize,
    idle: Notify,
}

impl TaskExecutor {
    /// Create a new executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = self.track();
        tokio::spawn(async move {
            task.await;
            drop(guard);
        });
    }

    /// Count a unit of work that lives outside a spawned task.
    ///
    /// The work counts as in-flight until the returned guard is dropped.
    /// Used for deliveries queued into long-lived worker loops, which are
    /// not tasks of their own but must still hold off [`quiesce`].
    ///
    /// [`quiesce`]: TaskExecutor::quiesce
    #[must_use]
    pub fn track(&self) -> InFlightGuard {
        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlightGuard { inner: Arc::clone(&self.inner) }
    }

    /// Number of tasks currently spawned and not yet finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Wait until no spawned task remains in flight.
    ///
    /// Tasks spawned while waiting (delivery chains, retries) extend the
    /// wait. Returns immediately if nothing is in flight.
    pub async fn quiesce(&self) {
        loop {
            let mut idle = pin!(self.inner.idle.notified());
            // Register interest before the counter check so a decrement
            // between check and await is not missed.
            idle.as_mut().enable();
            if self.inner.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }
}

/// Guard for a tracked unit of work; dropping it marks the work finished.
#[derive(Debug)]
pub struct InFlightGuard {
    inner: Arc<Inner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}
