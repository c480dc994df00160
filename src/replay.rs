//! Offline replay of recorded frames through the full pipeline.
//!
//! Time is simulated. Each record's timestamp (or a fixed frame interval when
//! records carry none) drives a [`ManualClock`], and announcements are fired by
//! a [`ManualTimer`] as the replay clock passes their deadlines. A recording
//! therefore replays with the same announcement behavior it would have had live,
//! only faster.

use crate::announce::clock::{Clock, ManualClock};
use crate::announce::speaker::Speaker;
use crate::announce::timer::ManualTimer;
use crate::classify::engine::InferenceEngine;
use crate::config::Config;
use crate::defaults::REPLAY_FRAME_INTERVAL_MS;
use crate::error::{PosewatchError, Result};
use crate::frames::FrameRecord;
use crate::pipeline::{FrameOutcome, PosturePipeline};
use crate::pose::normalizer::FeatureVector;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Engine that answers with the scores recorded alongside the current frame.
#[derive(Debug, Default)]
pub struct RecordedScores {
    current: Mutex<Option<Vec<f32>>>,
}

impl RecordedScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the scores for the next inference call.
    pub fn set(&self, scores: Option<Vec<f32>>) {
        if let Ok(mut current) = self.current.lock() {
            *current = scores;
        }
    }
}

impl InferenceEngine for RecordedScores {
    fn run(&self, _features: &FeatureVector) -> Result<Vec<f32>> {
        let mut current = self.current.lock().map_err(|_| PosewatchError::InferenceFailed {
            message: "recorded scores lock poisoned".to_string(),
        })?;
        current.take().ok_or_else(|| PosewatchError::InferenceFailed {
            message: "frame has no recorded scores".to_string(),
        })
    }

    fn name(&self) -> &str {
        "recorded"
    }
}

/// Replay settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayOptions {
    /// Spacing applied to records without a timestamp.
    pub frame_interval: Duration,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(REPLAY_FRAME_INTERVAL_MS),
        }
    }
}

/// One replayed frame, handed to the per-frame callback.
#[derive(Debug)]
pub struct ReplayEvent {
    /// 0-based position in the recording.
    pub index: usize,
    /// Simulated time since the start of the recording.
    pub at: Duration,
    pub result: Result<FrameOutcome>,
}

/// Totals for a finished replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub labeled: usize,
    pub not_detected: usize,
    pub errors: usize,
    /// Announcements scheduled by frames.
    pub scheduled: usize,
    /// Announcements that reached the speaker stage.
    pub spoken: usize,
    /// Simulated time of the last frame.
    pub duration: Duration,
}

/// Replays `records` and reports every frame through `on_frame`.
///
/// Frame-level failures are counted and reported through the callback; they
/// never stop the replay. Announcements still pending after the last frame are
/// fired before returning.
pub fn replay<I>(
    records: I,
    config: &Config,
    speaker: Arc<dyn Speaker>,
    options: ReplayOptions,
    mut on_frame: impl FnMut(&ReplayEvent),
) -> Result<ReplaySummary>
where
    I: IntoIterator<Item = FrameRecord>,
{
    config.validate()?;

    let engine = Arc::new(RecordedScores::new());
    let clock = ManualClock::new();
    let timer = Arc::new(ManualTimer::new());
    let pipeline = PosturePipeline::from_config(
        config,
        Arc::clone(&engine),
        clock.clone(),
        timer.clone(),
        speaker,
    );

    let mut summary = ReplaySummary::default();
    let mut at = Duration::ZERO;

    for (index, record) in records.into_iter().enumerate() {
        at = match record.timestamp_ms {
            Some(ms) => Duration::from_millis(ms),
            None if index == 0 => Duration::ZERO,
            None => at + options.frame_interval,
        };
        clock.set_offset(at);
        summary.spoken += timer.fire_due(clock.now());

        engine.set(record.scores);
        let result = pipeline.process_frame(&record.landmarks);

        summary.frames += 1;
        match &result {
            Ok(outcome) => {
                if outcome.decision.is_some() {
                    summary.labeled += 1;
                } else {
                    summary.not_detected += 1;
                }
                if outcome.announced {
                    summary.scheduled += 1;
                }
            }
            Err(e) => {
                warn!(frame = index, error = %e, "frame skipped");
                summary.errors += 1;
            }
        }

        on_frame(&ReplayEvent {
            index,
            at,
            result,
        });
    }
    summary.duration = at;

    while let Some(deadline) = timer.next_deadline() {
        clock.set_offset(deadline.saturating_duration_since(clock.origin()));
        summary.spoken += timer.fire_due(deadline);
    }

    debug!(
        frames = summary.frames,
        spoken = summary.spoken,
        "replay finished"
    );
    Ok(summary)
}
