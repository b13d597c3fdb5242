//! Deterministic scheduler for tests.
//!
//! `ManualScheduler` records registrations and never fires them on its
//! own. Tests inspect what was scheduled (how many timers, with which
//! delays) and decide when a timer fires. This makes scheduling
//! decisions assertable without any elapsed time, real or virtual.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use tracing::trace;

use crate::{TimerCallback, TimerHandle, TimerScheduler, lock};

struct Registration {
    delay: Duration,
    callback: TimerCallback,
}

#[derive(Default)]
struct ManualState {
    next_id: u64,
    /// `BTreeMap` so iteration follows registration order.
    timers: BTreeMap<TimerHandle, Registration>,
    total_scheduled: u64,
    total_cancelled: u64,
}

/// A [`TimerScheduler`] that only fires when told to.
///
/// Share it with the code under test through an `Arc`:
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use groundwork_timer::{ManualScheduler, TimerScheduler, callback};
///
/// let scheduler = Arc::new(ManualScheduler::new());
/// let handle = scheduler.schedule(Duration::from_secs(30), callback(|| async {}));
///
/// assert_eq!(scheduler.pending(), 1);
/// assert_eq!(scheduler.delay_of(handle), Some(Duration::from_secs(30)));
/// ```
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The delay a registration was scheduled with, if still outstanding.
    pub fn delay_of(&self, handle: TimerHandle) -> Option<Duration> {
        lock(&self.state).timers.get(&handle).map(|r| r.delay)
    }

    /// Outstanding handles, oldest first.
    pub fn handles(&self) -> Vec<TimerHandle> {
        lock(&self.state).timers.keys().copied().collect()
    }

    /// Delays of the outstanding registrations, oldest first.
    pub fn delays(&self) -> Vec<Duration> {
        lock(&self.state).timers.values().map(|r| r.delay).collect()
    }

    /// Removes a registration and hands back its callback without
    /// running it. Returns `None` if the handle is not outstanding.
    pub fn take(&self, handle: TimerHandle) -> Option<TimerCallback> {
        lock(&self.state)
            .timers
            .remove(&handle)
            .map(|r| r.callback)
    }

    /// Fires a timer now: removes the registration, then runs its
    /// callback to completion.
    ///
    /// Returns `false` if the handle was not outstanding (already fired
    /// or cancelled).
    pub async fn fire(&self, handle: TimerHandle) -> bool {
        // The lock guard is dropped at the end of this statement, before
        // the callback runs, so the callback may schedule or cancel.
        let Some(callback) = self.take(handle) else {
            return false;
        };
        trace!(timer = %handle, "manual timer fired");
        callback().await;
        true
    }

    /// Fires the outstanding timer with the shortest delay (oldest first
    /// among equals). Returns its handle, or `None` if nothing is pending.
    pub async fn fire_next(&self) -> Option<TimerHandle> {
        let next = {
            let state = lock(&self.state);
            state
                .timers
                .iter()
                .min_by_key(|(handle, r)| (r.delay, **handle))
                .map(|(handle, _)| *handle)
        };
        let handle = next?;
        self.fire(handle).await;
        Some(handle)
    }

    /// How many registrations were ever made.
    pub fn total_scheduled(&self) -> u64 {
        lock(&self.state).total_scheduled
    }

    /// How many outstanding registrations were cancelled (no-op cancels
    /// are not counted).
    pub fn total_cancelled(&self) -> u64 {
        lock(&self.state).total_cancelled
    }
}

impl TimerScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let handle = TimerHandle::new(state.next_id);
        state.timers.insert(handle, Registration { delay, callback });
        state.total_scheduled += 1;
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        let mut state = lock(&self.state);
        if state.timers.remove(&handle).is_some() {
            state.total_cancelled += 1;
        }
    }

    fn cancel_all(&self) {
        let mut state = lock(&self.state);
        let count = state.timers.len() as u64;
        state.timers.clear();
        state.total_cancelled += count;
    }

    fn pending(&self) -> usize {
        lock(&self.state).timers.len()
    }
}
