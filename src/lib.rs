//! posewatch - Posture classification from body landmarks
//!
//! Turns 33-point pose frames into posture labels and spoken announcements,
//! with a debounce so a flickering classifier does not flood the speaker.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod announce;
pub mod classify;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dataset;
pub mod defaults;
pub mod error;
pub mod frames;
pub mod pipeline;
pub mod pose;
pub mod replay;

// Core seams (landmarks → features → scores → label → speech)
pub use announce::{Clock, Speaker, Timer};
pub use classify::InferenceEngine;

// Pipeline
pub use pipeline::{FrameOutcome, PosturePipeline};

// Building blocks
pub use announce::{AnnouncementThrottle, DebouncePolicy};
pub use classify::{Decision, PostureLabel, interpret};
pub use pose::{FeatureVector, LandmarkSet, Normalizer};

// Error handling
pub use error::{PosewatchError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
