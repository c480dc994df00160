//! Arm-once, fire-after-deadline timers.
//!
//! The throttle never waits on a timer. It arms one and gets a handle back
//! that can cancel the task before it runs.

use crate::announce::clock::{Clock, SystemClock};
use crate::error::{PosewatchError, Result};
use crossbeam_channel::{RecvTimeoutError, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;
use tracing::debug;

/// Work run when a timer fires. Receives the instant it fired at.
pub type TimerTask = Box<dyn FnOnce(Instant) + Send + 'static>;

/// Schedules a task to run once a deadline has passed.
pub trait Timer: Send + Sync {
    /// Arm a one-shot timer.
    fn arm(&self, deadline: Instant, task: TimerTask) -> Result<TimerHandle>;
}

impl<T: Timer + ?Sized> Timer for Arc<T> {
    fn arm(&self, deadline: Instant, task: TimerTask) -> Result<TimerHandle> {
        (**self).arm(deadline, task)
    }
}

/// Handle to an armed timer. Dropping it does not cancel the timer.
pub struct TimerHandle {
    cancel: Box<dyn FnOnce() + Send>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Prevents the task from running if it has not fired yet.
    pub fn cancel(self) {
        (self.cancel)();
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle").finish_non_exhaustive()
    }
}

/// Timer backed by one short-lived thread per armed task.
#[derive(Debug, Clone, Default)]
pub struct ThreadTimer<C: Clock = SystemClock> {
    clock: C,
}

impl ThreadTimer<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock + Clone + 'static> ThreadTimer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock + Clone + 'static> Timer for ThreadTimer<C> {
    fn arm(&self, deadline: Instant, task: TimerTask) -> Result<TimerHandle> {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        // The thread holds a sender so the channel never disconnects; only an
        // explicit cancel ends the wait early.
        let keepalive = cancel_tx.clone();
        let clock = self.clock.clone();

        thread::Builder::new()
            .name("announce-timer".to_string())
            .spawn(move || {
                let _keepalive = keepalive;
                let wait = deadline.saturating_duration_since(clock.now());
                match cancel_rx.recv_timeout(wait) {
                    Ok(()) => debug!("announcement timer cancelled"),
                    Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                        task(clock.now())
                    }
                }
            })
            .map_err(|e| PosewatchError::TimerFailed {
                message: format!("failed to spawn timer thread: {}", e),
            })?;

        Ok(TimerHandle::new(move || {
            if cancel_tx.try_send(()).is_err() {
                // Full or closed: the timer was already cancelled or has fired.
            }
        }))
    }
}

struct Scheduled {
    deadline: Instant,
    cancelled: Arc<AtomicBool>,
    task: TimerTask,
}

/// Timer that only fires when told to.
///
/// Tasks run inside [`ManualTimer::fire_due`], on the caller's thread, in
/// deadline order. Pairs with [`ManualClock`](crate::announce::clock::ManualClock)
/// for deterministic tests and offline replay.
#[derive(Default)]
pub struct ManualTimer {
    scheduled: Mutex<Vec<Scheduled>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every task whose deadline is at or before `now`.
    ///
    /// Returns how many tasks ran. Tasks may arm new timers; those are only
    /// considered on the next call.
    pub fn fire_due(&self, now: Instant) -> usize {
        let mut due = {
            let Ok(mut scheduled) = self.scheduled.lock() else {
                return 0;
            };
            let (due, waiting): (Vec<_>, Vec<_>) = scheduled
                .drain(..)
                .partition(|entry| entry.deadline <= now);
            *scheduled = waiting;
            due
        };
        due.sort_by_key(|entry| entry.deadline);

        let mut fired = 0;
        for entry in due {
            if entry.cancelled.load(Ordering::SeqCst) {
                continue;
            }
            (entry.task)(entry.deadline);
            fired += 1;
        }
        fired
    }

    /// Number of armed tasks that are neither fired nor cancelled.
    pub fn pending(&self) -> usize {
        self.scheduled
            .lock()
            .map(|s| {
                s.iter()
                    .filter(|e| !e.cancelled.load(Ordering::SeqCst))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Earliest deadline still waiting, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduled.lock().ok().and_then(|s| {
            s.iter()
                .filter(|e| !e.cancelled.load(Ordering::SeqCst))
                .map(|e| e.deadline)
                .min()
        })
    }
}

impl Timer for ManualTimer {
    fn arm(&self, deadline: Instant, task: TimerTask) -> Result<TimerHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.scheduled
            .lock()
            .map_err(|_| PosewatchError::TimerFailed {
                message: "timer queue poisoned".to_string(),
            })?
            .push(Scheduled {
                deadline,
                cancelled: Arc::clone(&cancelled),
                task,
            });
        Ok(TimerHandle::new(move || {
            cancelled.store(true, Ordering::SeqCst)
        }))
    }
}
