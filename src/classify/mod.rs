//! Classification: the inference engine seam and score interpretation.

pub mod engine;
pub mod interpreter;

pub use engine::{InferenceEngine, ScriptedEngine};
pub use interpreter::{Decision, PostureLabel, interpret};
