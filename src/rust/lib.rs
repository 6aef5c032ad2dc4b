//! Text classification over packaged models.
//!
//! A model bundle carries the engine model together with its tokenizer and
//! label list. Load it from a named asset, an open file or a byte buffer, then
//! classify text into `(label, score)` categories in model output order.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use nlclassifier::{AssetContext, TextClassifier};
//!
//! let context = AssetContext::new("assets");
//! let classifier = TextClassifier::from_path(&context, "bert_nl_classifier.nlcb")?;
//!
//! let result = classifier.classify("unflinchingly bleak and desperate")?;
//! let negative = result.get("negative").map(|c| c.score());
//! let positive = result.get("positive").map(|c| c.score());
//! println!("negative: {:?}, positive: {:?}", negative, positive);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! The classifier can be shared across threads using `Arc`:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use nlclassifier::TextClassifier;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let bytes = std::fs::read("assets/bert_nl_classifier.nlcb")?;
//! let classifier = Arc::new(TextClassifier::from_buffer(&bytes)?);
//!
//! let mut handles = vec![];
//! for _ in 0..3 {
//!     let classifier = Arc::clone(&classifier);
//!     handles.push(thread::spawn(move || {
//!         classifier.classify("test text").unwrap();
//!     }));
//! }
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod bundle;
pub mod classifier;
pub mod engine;
mod runtime;

pub use asset::AssetContext;
pub use bundle::{BundleMetadata, ModelBundle, ScoreTransform};
pub use classifier::{
    Category, ClassificationResult, ClassifierBuilder, ClassifierError, ClassifierInfo, ModelHandle,
    ModelSource, SequenceLength, TextClassifier,
};
pub use engine::{InferenceEngine, ModelInput, OrtEngine};
pub use runtime::{create_session_builder, parse_optimization_level, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
