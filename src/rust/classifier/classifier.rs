use std::fs::File;
use std::path::Path;

use log::debug;

use super::builder::ClassifierBuilder;
use super::category::{Category, ClassificationResult};
use super::encoding::TextEncoding;
use super::error::ClassifierError;
use super::handle::ModelHandle;
use crate::asset::AssetContext;
use crate::engine::{InferenceEngine, OrtEngine};

/// Classifies text with a packaged model.
///
/// # Thread Safety
///
/// `classify` takes `&self` and keeps no per-call state, so a classifier can be
/// shared through `Arc` whenever its engine is `Send + Sync`. For the ONNX Runtime
/// engine concurrent runs on one session are supported by the runtime itself.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use nlclassifier::{AssetContext, TextClassifier};
///
/// let context = AssetContext::new("assets");
/// let classifier = TextClassifier::from_path(&context, "bert_nl_classifier.nlcb")?;
///
/// let result = classifier.classify("it's a charming and often affecting journey")?;
/// for category in &result {
///     println!("{}: {:.5}", category.label(), category.score());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TextClassifier<E: InferenceEngine = OrtEngine> {
    handle: ModelHandle<E>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<TextClassifier>();
    }
};

impl TextClassifier<OrtEngine> {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> ClassifierBuilder<OrtEngine> {
        ClassifierBuilder::new()
    }

    pub fn from_path<P: AsRef<Path>>(context: &AssetContext, name: P) -> Result<Self, ClassifierError> {
        Self::builder().build_from_path(context, name)
    }

    pub fn from_file(file: File) -> Result<Self, ClassifierError> {
        Self::builder().build_from_file(file)
    }

    pub fn from_buffer(buffer: &[u8]) -> Result<Self, ClassifierError> {
        Self::builder().build_from_buffer(buffer)
    }
}

impl<E: InferenceEngine> TextClassifier<E> {
    /// Wraps a loaded handle. A released handle yields a classifier that
    /// fails every call with `Released`.
    pub fn new(handle: ModelHandle<E>) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &ModelHandle<E> {
        &self.handle
    }

    pub fn is_ready(&self) -> bool {
        self.handle.is_valid()
    }

    /// Releases the model. Every later `classify` fails with `Released`.
    pub fn release(&mut self) {
        self.handle.release();
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        super::ClassifierInfo {
            source: self.handle.source().clone(),
            name: self.handle.metadata().name.clone(),
            engine: self.handle.engine().name().to_string(),
            labels: self.handle.labels().to_vec(),
            sequence_length: self.handle.sequence_length(),
            score_transform: self.handle.metadata().score_transform,
            fingerprint: self.handle.fingerprint().to_string(),
            ready: self.is_ready(),
        }
    }

    /// Counts the tokens `text` produces before truncation
    pub fn count_tokens(&self, text: &str) -> Result<usize, ClassifierError> {
        self.handle.count_tokens(text)
    }

    /// Classifies `text`, returning one category per model label in output order.
    ///
    /// # Errors
    /// - `EmptyInput` if `text` is empty
    /// - `Released` if the model has been released
    /// - `Tokenizer` if the text cannot be encoded
    /// - `Inference` if the forward pass fails or its output does not match the labels
    pub fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifierError> {
        if text.is_empty() {
            return Err(ClassifierError::EmptyInput);
        }
        if !self.handle.is_valid() {
            return Err(ClassifierError::Released);
        }

        let input = self.handle.encode(text)?;
        let scores = self.handle.run(&input)?;

        let labels = self.handle.labels();
        if !labels.is_empty() && labels.len() != scores.len() {
            return Err(ClassifierError::Inference(format!(
                "Model produced {} scores but the bundle lists {} labels",
                scores.len(),
                labels.len()
            )));
        }
        let scores = self.handle.metadata().score_transform.apply(scores);

        let categories: Vec<Category> = scores
            .into_iter()
            .enumerate()
            .map(|(i, score)| match labels.get(i) {
                Some(label) => Category::new(label.as_str(), score),
                None => Category::new(i.to_string(), score),
            })
            .collect();
        debug!("Classified {} tokens into {} categories", input.token_count(), categories.len());

        Ok(ClassificationResult::new(categories))
    }
}

impl<E: InferenceEngine> From<ModelHandle<E>> for TextClassifier<E> {
    fn from(handle: ModelHandle<E>) -> Self {
        Self::new(handle)
    }
}
