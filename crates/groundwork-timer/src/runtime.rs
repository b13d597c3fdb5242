//! The real scheduler, backed by the Tokio timer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::{TimerCallback, TimerHandle, TimerScheduler, lock};

/// Outstanding registrations, shared with the spawned timer tasks.
///
/// Each entry holds the sending half of a cancellation channel. Removing
/// the entry drops the sender, which wakes the task's `select!` and ends
/// it without running the callback.
#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    timers: Mutex<HashMap<TimerHandle, oneshot::Sender<()>>>,
}

/// [`TimerScheduler`] that spawns one Tokio task per registration.
///
/// Each task races `tokio::time::sleep(delay)` against its cancellation
/// channel. Tasks only hold a weak reference to the registry, so dropping
/// the scheduler drops every cancellation sender and all outstanding
/// timers end without firing.
///
/// # Panics
///
/// [`schedule`](TimerScheduler::schedule) spawns onto the current Tokio
/// runtime and panics if called outside of one.
pub struct TokioScheduler {
    registry: Arc<Registry>,
}

impl TokioScheduler {
    /// Creates a scheduler with no outstanding timers.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                timers: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let handle =
            TimerHandle::new(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        // Register before spawning: with a zero delay the task could
        // otherwise fire before its entry exists.
        lock(&self.registry.timers).insert(handle, cancel_tx);

        let registry = Arc::downgrade(&self.registry);
        tokio::spawn(run_timer(handle, delay, cancel_rx, registry, callback));

        debug!(timer = %handle, delay_ms = delay.as_millis() as u64, "timer scheduled");
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        if lock(&self.registry.timers).remove(&handle).is_some() {
            debug!(timer = %handle, "timer cancelled");
        }
    }

    fn cancel_all(&self) {
        let mut timers = lock(&self.registry.timers);
        let count = timers.len();
        timers.clear();
        if count > 0 {
            debug!(count, "all timers cancelled");
        }
    }

    fn pending(&self) -> usize {
        lock(&self.registry.timers).len()
    }
}

/// Body of one timer task.
async fn run_timer(
    handle: TimerHandle,
    delay: Duration,
    cancel_rx: oneshot::Receiver<()>,
    registry: Weak<Registry>,
    callback: TimerCallback,
) {
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        // Resolves with `Err` when the sender is dropped, which is how
        // `cancel` signals.
        _ = cancel_rx => return,
    }

    // Deregister before running. If the entry is already gone, a cancel
    // won the race against the sleep.
    let Some(registry) = registry.upgrade() else {
        return;
    };
    if lock(&registry.timers).remove(&handle).is_none() {
        return;
    }
    drop(registry);

    trace!(timer = %handle, "timer fired");
    callback().await;
}
