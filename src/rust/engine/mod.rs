//! The seam between the classifier and whatever executes the model.

mod onnx;

pub use onnx::{OnnxModel, OrtEngine};

use crate::classifier::ClassifierError;

/// Token tensors for a single sequence, batch size 1.
///
/// All three vectors always have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInput {
    pub ids: Vec<i64>,
    pub mask: Vec<i64>,
    pub segment_ids: Vec<i64>,
}

impl ModelInput {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of positions covered by the attention mask
    pub fn token_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m != 0).count()
    }
}

/// A runtime able to load serialized models and run their forward pass.
///
/// Implementations own no per-call state: `run` takes shared references so
/// a loaded model can serve concurrent callers when the runtime allows it.
pub trait InferenceEngine: Send + Sync {
    /// A model loaded into the runtime. Dropping it releases the runtime's memory.
    type Model: Send + Sync;

    fn name(&self) -> &str;

    /// Loads model bytes, failing with `ModelLoad` when the runtime rejects them
    fn load(&self, model: &[u8]) -> Result<Self::Model, ClassifierError>;

    /// `Some(n)` when the model only accepts sequences of exactly `n` tokens
    fn input_length(&self, model: &Self::Model) -> Option<usize>;

    /// Runs the forward pass and returns the flattened score output
    fn run(&self, model: &Self::Model, input: &ModelInput) -> Result<Vec<f32>, ClassifierError>;
}
