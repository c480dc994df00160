use crate::error::{PosewatchError, Result};
use crate::pose::normalizer::FeatureVector;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Trait for the posture classifier.
///
/// The network itself lives outside this crate; any runtime that maps a
/// 132-float feature vector to one score per class can implement this.
pub trait InferenceEngine: Send + Sync {
    /// Run the classifier on one feature vector.
    ///
    /// # Returns
    /// One raw score per class, in class-index order.
    fn run(&self, features: &FeatureVector) -> Result<Vec<f32>>;

    /// Name of the loaded model, for logging.
    fn name(&self) -> &str;
}

/// Implement InferenceEngine for Arc<T> so one model can back several pipelines.
impl<T: InferenceEngine> InferenceEngine for Arc<T> {
    fn run(&self, features: &FeatureVector) -> Result<Vec<f32>> {
        (**self).run(features)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl InferenceEngine for Box<dyn InferenceEngine> {
    fn run(&self, features: &FeatureVector) -> Result<Vec<f32>> {
        (**self).run(features)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Engine that replays pre-computed score vectors in order.
///
/// Used by tests and benchmarks. Each `run` call pops the
/// next queued vector; running on an empty queue is an inference failure.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    name: String,
    scores: Mutex<VecDeque<Vec<f32>>>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            scores: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a score vector for a later `run`.
    pub fn with_scores(self, scores: Vec<f32>) -> Self {
        self.push(scores);
        self
    }

    /// Queue a score vector through a shared reference.
    pub fn push(&self, scores: Vec<f32>) {
        if let Ok(mut queue) = self.scores.lock() {
            queue.push_back(scores);
        }
    }

    /// Number of `run` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Score vectors still waiting in the queue.
    pub fn remaining(&self) -> usize {
        self.scores.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl InferenceEngine for ScriptedEngine {
    fn run(&self, _features: &FeatureVector) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scores
            .lock()
            .map_err(|_| PosewatchError::InferenceFailed {
                message: "score queue poisoned".to_string(),
            })?
            .pop_front()
            .ok_or_else(|| PosewatchError::InferenceFailed {
                message: format!("{}: no scores queued", self.name),
            })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
