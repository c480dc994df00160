//! Turns raw classifier scores into a labeled decision.

use crate::error::{PosewatchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Posture classes, in the classifier's output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostureLabel {
    Normal,
    LegsUp,
    LyingDown,
    /// The winning index has no known class.
    Unrecognized,
}

impl PostureLabel {
    /// Maps a class index to its label. Unknown indices are `Unrecognized`.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => PostureLabel::Normal,
            1 => PostureLabel::LegsUp,
            2 => PostureLabel::LyingDown,
            _ => PostureLabel::Unrecognized,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostureLabel::Normal => "Normal",
            PostureLabel::LegsUp => "LegsUp",
            PostureLabel::LyingDown => "LyingDown",
            PostureLabel::Unrecognized => "Unrecognized",
        }
    }
}

impl fmt::Display for PostureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of interpreting one score vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub label: PostureLabel,
    /// The winning raw score. Not normalized; its range is whatever the engine emits.
    pub confidence: f32,
    /// Index of the winning score, `None` when no score was comparable.
    pub source_index: Option<usize>,
}

/// Picks the highest score; the lowest index wins exact ties.
///
/// NaN scores never win. If every score is NaN the decision is
/// `Unrecognized` with a NaN confidence.
///
/// # Errors
/// `EmptyScores` if `scores` is empty.
pub fn interpret(scores: &[f32]) -> Result<Decision> {
    if scores.is_empty() {
        return Err(PosewatchError::EmptyScores);
    }

    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }

    let decision = match best {
        Some((index, confidence)) => Decision {
            label: PostureLabel::from_index(index),
            confidence,
            source_index: Some(index),
        },
        None => Decision {
            label: PostureLabel::Unrecognized,
            confidence: f32::NAN,
            source_index: None,
        },
    };

    debug!(
        class = ?decision.source_index,
        confidence = decision.confidence,
        label = %decision.label,
        "classified frame"
    );
    Ok(decision)
}
