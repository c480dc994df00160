//! Pose representation: the landmark vocabulary and feature normalization.

pub mod landmark;
pub mod normalizer;

pub use landmark::{Landmark, LandmarkName, LandmarkSet};
pub use normalizer::{FeatureVector, Normalizer, PoseFrame};
