use std::fs::File;
use std::path::Path;

use super::classifier::TextClassifier;
use super::error::ClassifierError;
use super::handle::ModelHandle;
use crate::asset::AssetContext;
use crate::engine::{InferenceEngine, OrtEngine};
use crate::runtime::RuntimeConfig;

/// A builder for constructing a TextClassifier with a fluent interface.
///
/// The terminal methods mirror the three ways a model can be supplied: a named
/// asset, an open file, or an in-memory buffer.
#[derive(Debug)]
pub struct ClassifierBuilder<E: InferenceEngine = OrtEngine> {
    engine: E,
    max_seq_len: Option<usize>,
}

impl Default for ClassifierBuilder<OrtEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBuilder<OrtEngine> {
    /// Creates a builder backed by ONNX Runtime with its default configuration
    ///
    /// # Example
    /// ```
    /// use nlclassifier::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            engine: OrtEngine::default(),
            max_seq_len: None,
        }
    }

    /// Sets the runtime configuration for ONNX model execution
    ///
    /// # Example
    /// ```
    /// use nlclassifier::{ClassifierBuilder, RuntimeConfig};
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .with_runtime_config(RuntimeConfig::from_env());
    /// ```
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.engine = OrtEngine::new(config);
        self
    }
}

impl<E: InferenceEngine> ClassifierBuilder<E> {
    /// Replaces the inference engine backing the classifier
    pub fn with_engine<F: InferenceEngine>(self, engine: F) -> ClassifierBuilder<F> {
        ClassifierBuilder {
            engine,
            max_seq_len: self.max_seq_len,
        }
    }

    /// Overrides the bundle's maximum sequence length for models with a
    /// dynamic sequence dimension. Must leave room for two special tokens.
    pub fn with_max_seq_len(mut self, max_seq_len: usize) -> Result<Self, ClassifierError> {
        if max_seq_len < 2 {
            return Err(ClassifierError::ModelLoad(format!(
                "Max sequence length must be at least 2, got {}",
                max_seq_len
            )));
        }
        self.max_seq_len = Some(max_seq_len);
        Ok(self)
    }

    pub fn build_from_path<P: AsRef<Path>>(
        self,
        context: &AssetContext,
        name: P,
    ) -> Result<TextClassifier<E>, ClassifierError> {
        let handle = ModelHandle::from_path_with(self.engine, context, name)?;
        Ok(Self::finish(handle, self.max_seq_len))
    }

    pub fn build_from_file(self, file: File) -> Result<TextClassifier<E>, ClassifierError> {
        let handle = ModelHandle::from_file_with(self.engine, file)?;
        Ok(Self::finish(handle, self.max_seq_len))
    }

    pub fn build_from_buffer(self, buffer: &[u8]) -> Result<TextClassifier<E>, ClassifierError> {
        let handle = ModelHandle::from_buffer_with(self.engine, buffer)?;
        Ok(Self::finish(handle, self.max_seq_len))
    }

    fn finish(mut handle: ModelHandle<E>, max_seq_len: Option<usize>) -> TextClassifier<E> {
        if let Some(n) = max_seq_len {
            handle.set_max_seq_len(n);
        }
        TextClassifier::new(handle)
    }
}
