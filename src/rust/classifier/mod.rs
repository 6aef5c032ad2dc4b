mod builder;
mod category;
mod classifier;
mod encoding;
mod error;
mod handle;
pub(crate) mod utils;

pub use builder::ClassifierBuilder;
pub use category::{Category, ClassificationResult};
pub use classifier::TextClassifier;
pub use encoding::SequenceLength;
pub use error::ClassifierError;
pub use handle::{ModelHandle, ModelSource};

use crate::bundle::ScoreTransform;

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Where the model was loaded from
    pub source: ModelSource,
    /// Model name recorded in the bundle, if any
    pub name: Option<String>,
    /// Name of the engine running the model
    pub engine: String,
    /// Output labels in model output order
    pub labels: Vec<String>,
    pub sequence_length: SequenceLength,
    pub score_transform: ScoreTransform,
    /// SHA-256 of the bundle bytes
    pub fingerprint: String,
    /// False once the model has been released
    pub ready: bool,
}
