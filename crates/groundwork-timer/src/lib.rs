//! One-shot, cancellable timer scheduling for the Groundwork client.
//!
//! The session controller never calls `tokio::time` directly. It asks a
//! [`TimerScheduler`] to "run this callback once, after this delay" and
//! keeps the returned [`TimerHandle`] so it can cancel the timer later.
//! Two implementations exist:
//!
//! - [`TokioScheduler`]: the real one, backed by `tokio::time::sleep`.
//! - [`ManualScheduler`]: a deterministic test double that records
//!   registrations without executing them until told to fire.
//!
//! # Integration
//!
//! ```ignore
//! let handle = scheduler.schedule(
//!     Duration::from_secs(3570),
//!     timer::callback(move || async move { controller.refresh_token().await; }),
//! );
//! // ...later, before scheduling a replacement:
//! scheduler.cancel(handle);
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod manual;
mod runtime;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use manual::ManualScheduler;
pub use runtime::TokioScheduler;

// ---------------------------------------------------------------------------
// Handles and callbacks
// ---------------------------------------------------------------------------

/// Opaque identifier for one timer registration.
///
/// Handles are unique per scheduler instance and never reused, so a
/// stale handle can't accidentally cancel a newer timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

/// The future a fired timer drives to completion.
pub type TimerTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Work registered with a scheduler: called once when the timer fires.
///
/// It returns a future rather than doing the work inline because the
/// work (a token renewal) is itself asynchronous.
pub type TimerCallback = Box<dyn FnOnce() -> TimerTask + Send + 'static>;

/// Boxes an async closure into a [`TimerCallback`].
pub fn callback<F, Fut>(f: F) -> TimerCallback
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

// ---------------------------------------------------------------------------
// TimerScheduler
// ---------------------------------------------------------------------------

/// Runs callbacks once after a delay, with cancellation.
///
/// # Contract
///
/// - [`schedule`](Self::schedule) registers the callback and returns a
///   fresh handle. The registration holds one timer slot until it fires
///   or is cancelled.
/// - [`cancel`](Self::cancel) is idempotent. Cancelling a handle that
///   already fired or was already cancelled is a no-op, never an error.
/// - [`cancel_all`](Self::cancel_all) cancels every outstanding handle
///   created by this instance.
/// - A registration stops counting as outstanding the moment it fires,
///   before its callback runs. A callback that cancels its own handle
///   (e.g. while rescheduling itself) is therefore a no-op cancel.
///
/// # Trait bounds explained
///
/// - `Send + Sync`: the controller sits behind an `Arc` that is cloned
///   into spawned tasks and into timer callbacks, so its scheduler is
///   reached from whichever Tokio worker thread runs them.
/// - `'static`: the scheduler is owned by the controller for its whole
///   life and borrows nothing from the caller.
///
/// The methods take `&self`, not `&mut self`. Implementations keep their
/// registry behind a `Mutex`, which lets one shared scheduler be used
/// from several handles at once.
pub trait TimerScheduler: Send + Sync + 'static {
    /// Registers `callback` to run once after `delay`.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancels a registration. No-op if it already fired or was cancelled.
    fn cancel(&self, handle: TimerHandle);

    /// Cancels every outstanding registration.
    fn cancel_all(&self);

    /// Number of outstanding (not yet fired, not cancelled) registrations.
    fn pending(&self) -> usize;
}

/// Shared schedulers are schedulers too. Tests hand the controller an
/// `Arc<ManualScheduler>` and keep a clone to inspect and fire timers.
impl<S: TimerScheduler + ?Sized> TimerScheduler for Arc<S> {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        (**self).schedule(delay, callback)
    }

    fn cancel(&self, handle: TimerHandle) {
        (**self).cancel(handle);
    }

    fn cancel_all(&self) {
        (**self).cancel_all();
    }

    fn pending(&self) -> usize {
        (**self).pending()
    }
}

/// Locks a registry mutex, recovering the data if a previous holder
/// panicked. Registry updates are single map operations, so the data is
/// never left half-modified.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_handle_display() {
        assert_eq!(TimerHandle::new(4).to_string(), "T-4");
    }

    #[test]
    fn test_timer_handle_into_inner() {
        assert_eq!(TimerHandle::new(9).into_inner(), 9);
    }

    #[tokio::test]
    async fn test_callback_boxes_async_closure() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let cb = callback(move || async move {
            let _ = tx.send(5u8);
        });

        cb().await;

        assert_eq!(rx.await.unwrap(), 5);
    }

    #[test]
    fn test_arc_scheduler_delegates() {
        let shared = Arc::new(ManualScheduler::new());
        let as_trait: &dyn TimerScheduler = &shared;

        let handle = as_trait.schedule(Duration::from_secs(1), callback(|| async {}));

        assert_eq!(shared.pending(), 1);
        as_trait.cancel(handle);
        assert_eq!(shared.pending(), 0);
    }
}
