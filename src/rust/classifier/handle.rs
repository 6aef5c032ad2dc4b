use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, info};
use sha2::{Digest, Sha256};
use tokenizers::Tokenizer;

use super::encoding::{SequenceLength, TextEncoding};
use super::error::ClassifierError;
use crate::asset::AssetContext;
use crate::bundle::{BundleMetadata, ModelBundle};
use crate::engine::{InferenceEngine, ModelInput, OrtEngine};

/// Where a model handle's bytes came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A named asset, with the path it resolved to
    Asset(PathBuf),
    /// An already-open file handle
    File,
    /// An in-memory buffer
    Buffer,
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset(path) => write!(f, "asset {}", path.display()),
            Self::File => write!(f, "file handle"),
            Self::Buffer => write!(f, "buffer"),
        }
    }
}

/// A loaded classification model.
///
/// The handle exclusively owns the engine's copy of the model. It is released
/// exactly once, either by [`ModelHandle::release`] or when the handle is
/// dropped; afterwards nothing can run against it.
pub struct ModelHandle<E: InferenceEngine = OrtEngine> {
    source: ModelSource,
    metadata: BundleMetadata,
    tokenizer: Tokenizer,
    fingerprint: String,
    engine: E,
    model: Option<E::Model>,
}

impl ModelHandle<OrtEngine> {
    /// Resolves a named asset and loads it into ONNX Runtime
    pub fn from_path<P: AsRef<Path>>(context: &AssetContext, name: P) -> Result<Self, ClassifierError> {
        Self::from_path_with(OrtEngine::default(), context, name)
    }

    pub fn from_file(file: File) -> Result<Self, ClassifierError> {
        Self::from_file_with(OrtEngine::default(), file)
    }

    pub fn from_buffer(buffer: &[u8]) -> Result<Self, ClassifierError> {
        Self::from_buffer_with(OrtEngine::default(), buffer)
    }
}

impl<E: InferenceEngine> ModelHandle<E> {
    /// Resolves `name` in the asset context and loads it.
    ///
    /// # Errors
    /// - `ResourceNotFound` if no asset root contains `name`
    /// - `ModelLoad` if the file is not a valid bundle or the engine rejects the model
    pub fn from_path_with<P: AsRef<Path>>(
        engine: E,
        context: &AssetContext,
        name: P,
    ) -> Result<Self, ClassifierError> {
        let path = context.resolve(name)?;
        info!("Loading model from {:?}", path);
        let bytes = fs::read(&path)?;
        Self::load(engine, &bytes, ModelSource::Asset(path))
    }

    /// Loads a bundle from an open file, reading it to the end.
    pub fn from_file_with(engine: E, mut file: File) -> Result<Self, ClassifierError> {
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Self::load(engine, &bytes, ModelSource::File)
    }

    /// Loads a bundle held in memory.
    ///
    /// The buffer only has to live for the duration of the call. Every failure
    /// to interpret it is reported as `InvalidBuffer`.
    pub fn from_buffer_with(engine: E, buffer: &[u8]) -> Result<Self, ClassifierError> {
        if buffer.is_empty() {
            return Err(ClassifierError::InvalidBuffer("Model buffer is empty".into()));
        }
        Self::load(engine, buffer, ModelSource::Buffer).map_err(ClassifierError::into_invalid_buffer)
    }

    fn load(engine: E, bytes: &[u8], source: ModelSource) -> Result<Self, ClassifierError> {
        let (metadata, model_bytes) = ModelBundle::split(bytes)?;
        let tokenizer = metadata
            .build_tokenizer()
            .map_err(|e| ClassifierError::ModelLoad(format!("Invalid tokenizer in bundle: {}", e)))?;

        let mut hasher = Sha256::new();
        hasher.update(bytes);
        let fingerprint = format!("{:x}", hasher.finalize());

        let model = engine.load(model_bytes)?;
        info!(
            "Model loaded from {} with {} ({} labels, fingerprint {})",
            source,
            engine.name(),
            metadata.labels.len(),
            &fingerprint[..12]
        );

        Ok(Self {
            source,
            metadata,
            tokenizer,
            fingerprint,
            engine,
            model: Some(model),
        })
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    pub fn metadata(&self) -> &BundleMetadata {
        &self.metadata
    }

    pub fn labels(&self) -> &[String] {
        &self.metadata.labels
    }

    /// SHA-256 of the bundle bytes, hex encoded
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn is_valid(&self) -> bool {
        self.model.is_some()
    }

    /// Frees the engine model. Calling this more than once has no effect.
    pub fn release(&mut self) {
        if let Some(model) = self.model.take() {
            drop(model);
            info!("Released model loaded from {}", self.source);
        }
    }

    pub(crate) fn set_max_seq_len(&mut self, max_seq_len: usize) {
        debug!("Overriding max sequence length {} -> {}", self.metadata.max_seq_len, max_seq_len);
        self.metadata.max_seq_len = max_seq_len;
    }

    pub(crate) fn run(&self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
        let model = self.model.as_ref().ok_or(ClassifierError::Released)?;
        self.engine.run(model, input)
    }
}

impl<E: InferenceEngine> TextEncoding for ModelHandle<E> {
    fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    fn sequence_length(&self) -> SequenceLength {
        match self.model.as_ref().and_then(|m| self.engine.input_length(m)) {
            Some(n) => SequenceLength::Fixed(n),
            None => SequenceLength::UpTo(self.metadata.max_seq_len),
        }
    }

    fn lowercase(&self) -> bool {
        self.metadata.lowercase
    }
}

impl<E: InferenceEngine> Drop for ModelHandle<E> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<E: InferenceEngine> fmt::Debug for ModelHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("source", &self.source)
            .field("engine", &self.engine.name())
            .field("labels", &self.metadata.labels)
            .field("fingerprint", &self.fingerprint)
            .field("valid", &self.is_valid())
            .finish()
    }
}
