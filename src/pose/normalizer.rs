//! Translation- and scale-invariant feature extraction.
//!
//! Landmarks are re-centered on the hip midpoint and divided by a scale taken
//! from the pose itself, so the classifier sees the same vector regardless of
//! where the subject stands or how far they are from the camera.

use crate::defaults;
use crate::error::{PosewatchError, Result};
use crate::pose::landmark::{Landmark, LandmarkName, LandmarkSet};
use serde::Serialize;
use tracing::trace;

/// Floats printed per trace line when dumping a feature vector.
const TRACE_ROW_WIDTH: usize = 12;

/// Normalized pose representation fed to the classifier.
///
/// Layout is landmark-major, channel-minor: `[x0, y0, z0, 1.0, x1, y1, z1, 1.0, ...]`.
/// The classifier was trained on exactly this layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The four channels of landmark `index`.
    pub fn landmark(&self, index: usize) -> Option<&[f32]> {
        let start = index * defaults::FEATURE_CHANNELS;
        self.values.get(start..start + defaults::FEATURE_CHANNELS)
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }
}

/// Anchor points and scale computed for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseFrame {
    pub hip_center: (f32, f32),
    pub shoulder_center: (f32, f32),
    pub torso_size: f32,
    pub max_distance: f32,
    pub scale: f32,
}

/// Converts landmark sets into feature vectors.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    torso_multiplier: f32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(defaults::TORSO_SIZE_MULTIPLIER)
    }
}

impl Normalizer {
    pub fn new(torso_multiplier: f32) -> Self {
        Self { torso_multiplier }
    }

    pub fn torso_multiplier(&self) -> f32 {
        self.torso_multiplier
    }

    /// Computes the hip/shoulder anchors and the normalization scale.
    ///
    /// # Errors
    /// - `InvalidInput` if the set does not hold exactly 33 landmarks
    /// - `DegenerateScale` if any coordinate is not finite, or the scale is
    ///   zero, negative or NaN
    pub fn frame(&self, landmarks: &LandmarkSet) -> Result<PoseFrame> {
        if !landmarks.is_complete() {
            return Err(PosewatchError::InvalidInput {
                expected: defaults::LANDMARK_COUNT,
                actual: landmarks.len(),
            });
        }

        if !landmarks.iter().all(Landmark::is_finite) {
            return Err(PosewatchError::DegenerateScale { scale: f32::NAN });
        }

        let hip_center = midpoint(landmarks, LandmarkName::LeftHip, LandmarkName::RightHip)?;
        let shoulder_center = midpoint(
            landmarks,
            LandmarkName::LeftShoulder,
            LandmarkName::RightShoulder,
        )?;

        let max_distance = landmarks
            .iter()
            .map(|lm| lm.planar_distance_to(hip_center.0, hip_center.1))
            .fold(0.0f32, f32::max);

        let dx = shoulder_center.0 - hip_center.0;
        let dy = shoulder_center.1 - hip_center.1;
        let torso_size = (dx * dx + dy * dy).sqrt();

        let scale = (torso_size * self.torso_multiplier).max(max_distance);
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(PosewatchError::DegenerateScale { scale });
        }

        Ok(PoseFrame {
            hip_center,
            shoulder_center,
            torso_size,
            max_distance,
            scale,
        })
    }

    /// Normalizes one frame into a 132-entry feature vector.
    pub fn normalize(&self, landmarks: &LandmarkSet) -> Result<FeatureVector> {
        let frame = self.frame(landmarks)?;
        let (cx, cy) = frame.hip_center;

        let mut values = Vec::with_capacity(defaults::FEATURE_LEN);
        for lm in landmarks {
            values.push((lm.x - cx) / frame.scale);
            values.push((lm.y - cy) / frame.scale);
            values.push(lm.z / frame.scale);
            values.push(defaults::PRESENCE_MARKER);
        }

        if tracing::enabled!(tracing::Level::TRACE) {
            for (row, chunk) in values.chunks(TRACE_ROW_WIDTH).enumerate() {
                trace!(row, values = ?chunk, "feature row");
            }
        }

        Ok(FeatureVector { values })
    }
}

fn midpoint(landmarks: &LandmarkSet, a: LandmarkName, b: LandmarkName) -> Result<(f32, f32)> {
    match (landmarks.get(a), landmarks.get(b)) {
        (Some(a), Some(b)) => Ok(((a.x + b.x) * 0.5, (a.y + b.y) * 0.5)),
        _ => Err(PosewatchError::InvalidInput {
            expected: defaults::LANDMARK_COUNT,
            actual: landmarks.len(),
        }),
    }
}
