//! Debounce for spoken announcements.
//!
//! The pipeline runs once per video frame, tens of times a second. The throttle
//! turns that stream into at most one announcement per delay window: the
//! first request arms a timer, and requests arriving while it is pending are
//! dropped (or, under `KeepLatest`, only replace the text).

use crate::announce::speaker::Speaker;
use crate::announce::timer::{Timer, TimerHandle};
use crate::defaults;
use crate::error::{PosewatchError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What happens to requests made while an announcement is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebouncePolicy {
    /// Drop them; the first requested text is spoken.
    #[default]
    KeepFirst,
    /// Replace the pending text; the latest requested text is spoken.
    /// The deadline does not move.
    KeepLatest,
}

/// Mutable state of one throttle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrottleState {
    /// When the last announcement fired.
    pub last_emission: Option<Instant>,
    /// Text waiting to be spoken. `Some` means PENDING.
    pub pending: Option<String>,
}

#[derive(Default)]
struct Inner {
    state: ThrottleState,
    /// Bumped on every arm and reset so a stale timer callback can tell it
    /// no longer owns the pending slot.
    generation: u64,
    handle: Option<TimerHandle>,
}

/// Rate limiter between the classifier and the speech engine.
pub struct AnnouncementThrottle {
    delay: Duration,
    policy: DebouncePolicy,
    inner: Arc<Mutex<Inner>>,
    timer: Arc<dyn Timer>,
    speaker: Arc<dyn Speaker>,
}

impl AnnouncementThrottle {
    /// Throttle with the default 2 s delay and `KeepFirst` policy.
    pub fn new(timer: Arc<dyn Timer>, speaker: Arc<dyn Speaker>) -> Self {
        Self {
            delay: Duration::from_millis(defaults::ANNOUNCE_DELAY_MS),
            policy: DebouncePolicy::KeepFirst,
            inner: Arc::new(Mutex::new(Inner::default())),
            timer,
            speaker,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_policy(mut self, policy: DebouncePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn policy(&self) -> DebouncePolicy {
        self.policy
    }

    /// Asks for `message` to be spoken `delay` after `now`.
    ///
    /// Returns `Ok(true)` if a new announcement was scheduled, `Ok(false)` if
    /// one was already pending. Never blocks on the speech engine.
    ///
    /// # Errors
    /// `TimerFailed` if the timer could not be armed; the throttle is left idle.
    pub fn request(&self, message: &str, now: Instant) -> Result<bool> {
        let mut inner = self.lock()?;

        if let Some(pending) = inner.state.pending.as_mut() {
            match self.policy {
                DebouncePolicy::KeepFirst => {
                    debug!(dropped = message, pending = %pending, "announcement already pending");
                }
                DebouncePolicy::KeepLatest => {
                    if pending != message {
                        debug!(from = %pending, to = message, "replacing pending announcement");
                        *pending = message.to_string();
                    }
                }
            }
            return Ok(false);
        }

        inner.generation += 1;
        let generation = inner.generation;
        let deadline = now + self.delay;

        let task_inner = Arc::clone(&self.inner);
        let speaker = Arc::clone(&self.speaker);
        let handle = self.timer.arm(
            deadline,
            Box::new(move |fired_at| fire(&task_inner, speaker.as_ref(), generation, fired_at)),
        )?;

        inner.state.pending = Some(message.to_string());
        inner.handle = Some(handle);
        debug!(text = message, delay_ms = self.delay.as_millis() as u64, "announcement scheduled");
        Ok(true)
    }

    /// Cancels any pending announcement and returns to idle.
    ///
    /// This is the only way to cancel. Dropping the throttle leaves a
    /// scheduled announcement to fire.
    pub fn reset(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.generation += 1;
        inner.state.pending = None;
        if let Some(handle) = inner.handle.take() {
            handle.cancel();
            debug!("pending announcement cancelled");
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.state.pending.is_some())
            .unwrap_or(false)
    }

    pub fn last_emission(&self) -> Option<Instant> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.state.last_emission)
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ThrottleState {
        self.inner
            .lock()
            .map(|inner| inner.state.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| PosewatchError::TimerFailed {
            message: "announcement state poisoned".to_string(),
        })
    }
}

/// Timer callback: PENDING -> IDLE, then speak.
///
/// The state goes idle before speaking so a failing or slow speech engine
/// never leaves the throttle stuck in PENDING.
fn fire(inner: &Mutex<Inner>, speaker: &dyn Speaker, generation: u64, fired_at: Instant) {
    let message = {
        let Ok(mut inner) = inner.lock() else {
            return;
        };
        if inner.generation != generation {
            return;
        }
        inner.handle = None;
        inner.state.last_emission = Some(fired_at);
        inner.state.pending.take()
    };

    let Some(message) = message else {
        return;
    };

    info!(text = %message, speaker = speaker.name(), "announcing");
    if let Err(e) = speaker.speak(&message) {
        warn!(error = %e, text = %message, "announcement failed");
    }
}
