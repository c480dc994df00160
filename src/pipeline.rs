//! Per-frame orchestration: normalize, classify, interpret, announce.

use crate::announce::clock::{Clock, SystemClock};
use crate::announce::speaker::Speaker;
use crate::announce::throttle::AnnouncementThrottle;
use crate::announce::timer::Timer;
use crate::classify::engine::InferenceEngine;
use crate::classify::interpreter::{Decision, interpret};
use crate::config::{Config, LabelsConfig};
use crate::error::Result;
use crate::pose::landmark::LandmarkSet;
use crate::pose::normalizer::Normalizer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of processing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    /// `None` when no pose was detected.
    pub decision: Option<Decision>,
    /// Display text for the frame.
    pub text: String,
    /// Whether this frame scheduled a new announcement.
    pub announced: bool,
}

/// Single entry point from landmark frames to posture labels.
///
/// Frames are processed synchronously on the caller's thread. The only state
/// that outlives a frame is inside the announcement throttle, so an error on
/// one frame has no effect on the next.
pub struct PosturePipeline<E: InferenceEngine, C: Clock = SystemClock> {
    normalizer: Normalizer,
    engine: E,
    throttle: Option<AnnouncementThrottle>,
    labels: LabelsConfig,
    clock: C,
}

impl<E: InferenceEngine> PosturePipeline<E, SystemClock> {
    /// Pipeline with default normalization and labels, and no announcements.
    pub fn new(engine: E) -> Self {
        Self::with_clock(engine, SystemClock)
    }
}

impl<E: InferenceEngine, C: Clock> PosturePipeline<E, C> {
    pub fn with_clock(engine: E, clock: C) -> Self {
        Self {
            normalizer: Normalizer::default(),
            engine,
            throttle: None,
            labels: LabelsConfig::default(),
            clock,
        }
    }

    /// Builds a pipeline from configuration.
    ///
    /// Announcements go through `timer` and `speaker` unless
    /// `announce.enabled` is false.
    pub fn from_config(
        config: &Config,
        engine: E,
        clock: C,
        timer: Arc<dyn Timer>,
        speaker: Arc<dyn Speaker>,
    ) -> Self {
        let mut pipeline = Self::with_clock(engine, clock)
            .with_normalizer(Normalizer::new(config.normalizer.torso_multiplier))
            .with_labels(config.labels.clone());

        if config.announce.enabled {
            pipeline = pipeline.with_throttle(
                AnnouncementThrottle::new(timer, speaker)
                    .with_delay(Duration::from_millis(config.announce.delay_ms))
                    .with_policy(config.announce.policy),
            );
        }
        pipeline
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_throttle(mut self, throttle: AnnouncementThrottle) -> Self {
        self.throttle = Some(throttle);
        self
    }

    pub fn with_labels(mut self, labels: LabelsConfig) -> Self {
        self.labels = labels;
        self
    }

    /// Processes one frame and returns its display text.
    ///
    /// # Errors
    /// Normalization, inference and interpretation errors are returned as-is;
    /// no announcement is scheduled for a failed frame.
    pub fn process(&self, landmarks: &LandmarkSet) -> Result<String> {
        self.process_frame(landmarks).map(|outcome| outcome.text)
    }

    /// Like [`process`](Self::process), but also returns the decision and
    /// whether an announcement was scheduled.
    pub fn process_frame(&self, landmarks: &LandmarkSet) -> Result<FrameOutcome> {
        if landmarks.is_empty() {
            debug!("no pose detected");
            return Ok(FrameOutcome {
                decision: None,
                text: self.labels.not_detected.clone(),
                announced: false,
            });
        }

        let features = self.normalizer.normalize(landmarks)?;
        let scores = self.engine.run(&features)?;
        let decision = interpret(&scores)?;
        let text = self.labels.text_for(decision.label).to_string();

        let announced = match &self.throttle {
            Some(throttle) => match throttle.request(&text, self.clock.now()) {
                Ok(scheduled) => scheduled,
                Err(e) => {
                    warn!(error = %e, "could not schedule announcement");
                    false
                }
            },
            None => false,
        };

        Ok(FrameOutcome {
            decision: Some(decision),
            text,
            announced,
        })
    }

    pub fn throttle(&self) -> Option<&AnnouncementThrottle> {
        self.throttle.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn labels(&self) -> &LabelsConfig {
        &self.labels
    }
}
