//! Landmark vocabulary and per-frame landmark sets.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named joints in the order the pose detector emits them.
///
/// The discriminant is the index position inside a [`LandmarkSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkName {
    Nose = 0,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl LandmarkName {
    /// Every landmark, in vocabulary order.
    pub const ALL: [LandmarkName; defaults::LANDMARK_COUNT] = [
        LandmarkName::Nose,
        LandmarkName::LeftEyeInner,
        LandmarkName::LeftEye,
        LandmarkName::LeftEyeOuter,
        LandmarkName::RightEyeInner,
        LandmarkName::RightEye,
        LandmarkName::RightEyeOuter,
        LandmarkName::LeftEar,
        LandmarkName::RightEar,
        LandmarkName::MouthLeft,
        LandmarkName::MouthRight,
        LandmarkName::LeftShoulder,
        LandmarkName::RightShoulder,
        LandmarkName::LeftElbow,
        LandmarkName::RightElbow,
        LandmarkName::LeftWrist,
        LandmarkName::RightWrist,
        LandmarkName::LeftPinky,
        LandmarkName::RightPinky,
        LandmarkName::LeftIndex,
        LandmarkName::RightIndex,
        LandmarkName::LeftThumb,
        LandmarkName::RightThumb,
        LandmarkName::LeftHip,
        LandmarkName::RightHip,
        LandmarkName::LeftKnee,
        LandmarkName::RightKnee,
        LandmarkName::LeftAnkle,
        LandmarkName::RightAnkle,
        LandmarkName::LeftHeel,
        LandmarkName::RightHeel,
        LandmarkName::LeftFootIndex,
        LandmarkName::RightFootIndex,
    ];

    /// Index of this landmark inside a full set.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Looks up the landmark at `index`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Snake-case name used by the detector's vocabulary.
    pub fn as_str(self) -> &'static str {
        match self {
            LandmarkName::Nose => "nose",
            LandmarkName::LeftEyeInner => "left_eye_inner",
            LandmarkName::LeftEye => "left_eye",
            LandmarkName::LeftEyeOuter => "left_eye_outer",
            LandmarkName::RightEyeInner => "right_eye_inner",
            LandmarkName::RightEye => "right_eye",
            LandmarkName::RightEyeOuter => "right_eye_outer",
            LandmarkName::LeftEar => "left_ear",
            LandmarkName::RightEar => "right_ear",
            LandmarkName::MouthLeft => "mouth_left",
            LandmarkName::MouthRight => "mouth_right",
            LandmarkName::LeftShoulder => "left_shoulder",
            LandmarkName::RightShoulder => "right_shoulder",
            LandmarkName::LeftElbow => "left_elbow",
            LandmarkName::RightElbow => "right_elbow",
            LandmarkName::LeftWrist => "left_wrist",
            LandmarkName::RightWrist => "right_wrist",
            LandmarkName::LeftPinky => "left_pinky_1",
            LandmarkName::RightPinky => "right_pinky_1",
            LandmarkName::LeftIndex => "left_index_1",
            LandmarkName::RightIndex => "right_index_1",
            LandmarkName::LeftThumb => "left_thumb_2",
            LandmarkName::RightThumb => "right_thumb_2",
            LandmarkName::LeftHip => "left_hip",
            LandmarkName::RightHip => "right_hip",
            LandmarkName::LeftKnee => "left_knee",
            LandmarkName::RightKnee => "right_knee",
            LandmarkName::LeftAnkle => "left_ankle",
            LandmarkName::RightAnkle => "right_ankle",
            LandmarkName::LeftHeel => "left_heel",
            LandmarkName::RightHeel => "right_heel",
            LandmarkName::LeftFootIndex => "left_foot_index",
            LandmarkName::RightFootIndex => "right_foot_index",
        }
    }
}

impl fmt::Display for LandmarkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single joint position in image-relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Planar (x, y) distance to a point.
    pub fn planar_distance_to(&self, x: f32, y: f32) -> f32 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<[f32; 3]> for Landmark {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// One frame of landmarks, in vocabulary order.
///
/// An empty set means the detector found no pose in the frame. Sets of any
/// other length than [`defaults::LANDMARK_COUNT`] are representable but are
/// rejected by the normalizer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    landmarks: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// A set representing "no pose detected".
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_points(points: &[[f32; 3]]) -> Self {
        Self::new(points.iter().copied().map(Landmark::from).collect())
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Whether the set carries exactly one landmark per vocabulary entry.
    pub fn is_complete(&self) -> bool {
        self.landmarks.len() == defaults::LANDMARK_COUNT
    }

    pub fn get(&self, name: LandmarkName) -> Option<&Landmark> {
        self.landmarks.get(name.index())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Landmark> {
        self.landmarks.iter()
    }

    pub fn as_slice(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Returns a copy with every landmark passed through `f`.
    pub fn map(&self, f: impl FnMut(&Landmark) -> Landmark) -> Self {
        Self::new(self.landmarks.iter().map(f).collect())
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(landmarks: Vec<Landmark>) -> Self {
        Self::new(landmarks)
    }
}

impl<'a> IntoIterator for &'a LandmarkSet {
    type Item = &'a Landmark;
    type IntoIter = std::slice::Iter<'a, Landmark>;

    fn into_iter(self) -> Self::IntoIter {
        self.landmarks.iter()
    }
}
