//! Error types for posewatch.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PosewatchError {
    // Frame errors
    #[error("Invalid landmark set: expected {expected} landmarks, got {actual}")]
    InvalidInput { expected: usize, actual: usize },

    #[error("Degenerate pose geometry: normalization scale is {scale}")]
    DegenerateScale { scale: f32 },

    #[error("Classifier returned an empty score vector")]
    EmptyScores,

    #[error("Inference failed: {message}")]
    InferenceFailed { message: String },

    // Announcement errors
    #[error("Speech tool not found: {tool}")]
    SpeechToolNotFound { tool: String },

    #[error("Speech failed: {message}")]
    SpeechFailed { message: String },

    #[error("Announcement timer failed: {message}")]
    TimerFailed { message: String },

    // Input record errors
    #[error("Invalid frame record on line {line}: {message}")]
    FrameParse { line: usize, message: String },

    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl PosewatchError {
    /// Whether this error only affects the current frame.
    ///
    /// The pipeline keeps no failure state, so callers can skip the frame and
    /// carry on with the next one.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            PosewatchError::InvalidInput { .. }
                | PosewatchError::DegenerateScale { .. }
                | PosewatchError::EmptyScores
                | PosewatchError::InferenceFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PosewatchError>;
