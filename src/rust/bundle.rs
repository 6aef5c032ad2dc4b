//! The single-file model bundle format.
//!
//! A bundle packs the engine model together with everything needed to turn
//! text into model input and model output into categories:
//!
//! ```text
//! +--------+-------------+----------------+----------------+-------------+
//! | "NLCB" | version u16 | meta len u32   | metadata JSON  | model bytes |
//! +--------+-------------+----------------+----------------+-------------+
//! ```
//!
//! Integers are little-endian. The model bytes run to the end of the buffer
//! and are handed to the inference engine untouched.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::{debug, info};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::classifier::utils::{sigmoid, softmax};
use crate::classifier::ClassifierError;

const MAGIC: &[u8; 4] = b"NLCB";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = MAGIC.len() + 2 + 4;

/// Sequence length used when a bundle does not specify one
pub const DEFAULT_MAX_SEQ_LEN: usize = 128;

/// How raw model outputs are turned into category scores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTransform {
    /// Scores are reported exactly as the model produced them
    #[default]
    None,
    Softmax,
    Sigmoid,
}

impl ScoreTransform {
    pub fn apply(self, scores: Vec<f32>) -> Vec<f32> {
        match self {
            Self::None => scores,
            Self::Softmax => softmax(&Array1::from_vec(scores)).to_vec(),
            Self::Sigmoid => sigmoid(&Array1::from_vec(scores)).to_vec(),
        }
    }
}

impl fmt::Display for ScoreTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Softmax => write!(f, "softmax"),
            Self::Sigmoid => write!(f, "sigmoid"),
        }
    }
}

impl FromStr for ScoreTransform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "softmax" => Ok(Self::Softmax),
            "sigmoid" => Ok(Self::Sigmoid),
            other => Err(format!("unknown score transform '{}' (expected none, softmax or sigmoid)", other)),
        }
    }
}

fn default_max_seq_len() -> usize {
    DEFAULT_MAX_SEQ_LEN
}

fn default_lowercase() -> bool {
    true
}

/// Everything a bundle carries besides the engine model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Output labels in model output order. When empty, categories are
    /// labelled with their output index.
    #[serde(default)]
    pub labels: Vec<String>,
    /// A serialized HuggingFace tokenizer definition
    pub tokenizer: serde_json::Value,
    #[serde(default = "default_max_seq_len")]
    pub max_seq_len: usize,
    /// ASCII-lowercase input text before tokenizing
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
    #[serde(default)]
    pub score_transform: ScoreTransform,
}

impl BundleMetadata {
    pub fn new(tokenizer: serde_json::Value) -> Self {
        Self {
            name: None,
            labels: Vec::new(),
            tokenizer,
            max_seq_len: DEFAULT_MAX_SEQ_LEN,
            lowercase: true,
            score_transform: ScoreTransform::None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_labels(mut self, labels: Vec<impl Into<String>>) -> Self {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_seq_len(mut self, max_seq_len: usize) -> Self {
        self.max_seq_len = max_seq_len;
        self
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn with_score_transform(mut self, transform: ScoreTransform) -> Self {
        self.score_transform = transform;
        self
    }

    /// Builds the tokenizer described by this metadata
    pub fn build_tokenizer(&self) -> Result<Tokenizer, ClassifierError> {
        let json = serde_json::to_vec(&self.tokenizer)
            .map_err(|e| ClassifierError::Tokenizer(e.to_string()))?;
        Tokenizer::from_bytes(json).map_err(|e| ClassifierError::Tokenizer(e.to_string()))
    }

    fn validate(&self) -> Result<(), ClassifierError> {
        if self.max_seq_len < 2 {
            return Err(ClassifierError::ModelLoad(format!(
                "max_seq_len must leave room for special tokens, got {}",
                self.max_seq_len
            )));
        }
        if let Some(pos) = self.labels.iter().position(|l| l.is_empty()) {
            return Err(ClassifierError::ModelLoad(format!("Label {} cannot be empty", pos)));
        }
        Ok(())
    }
}

/// A decoded bundle: metadata plus the engine model bytes
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    pub metadata: BundleMetadata,
    pub model: Vec<u8>,
}

impl ModelBundle {
    pub fn new(metadata: BundleMetadata, model: Vec<u8>) -> Self {
        Self { metadata, model }
    }

    /// Packs an engine model file and a `tokenizer.json` into a bundle.
    pub fn from_files(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
    ) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        let tokenizer_path = tokenizer_path.as_ref();
        if !model_path.exists() {
            return Err(ClassifierError::ResourceNotFound(model_path.to_path_buf()));
        }
        if !tokenizer_path.exists() {
            return Err(ClassifierError::ResourceNotFound(tokenizer_path.to_path_buf()));
        }

        let tokenizer_json = fs::read(tokenizer_path)?;
        let tokenizer = serde_json::from_slice(&tokenizer_json)
            .map_err(|e| ClassifierError::Tokenizer(format!("Failed to parse tokenizer: {}", e)))?;
        let metadata = BundleMetadata::new(tokenizer);
        // Fail at pack time rather than at load time
        metadata.build_tokenizer()?;

        let model = fs::read(model_path)?;
        info!("Packed {} model bytes from {:?}", model.len(), model_path);
        Ok(Self::new(metadata, model))
    }

    /// Splits a bundle into its metadata and a borrowed view of the model bytes.
    pub fn split(bytes: &[u8]) -> Result<(BundleMetadata, &[u8]), ClassifierError> {
        if bytes.len() < HEADER_LEN {
            return Err(ClassifierError::ModelLoad(format!(
                "Bundle is truncated: {} bytes, header needs {}",
                bytes.len(),
                HEADER_LEN
            )));
        }
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(ClassifierError::ModelLoad("Not a model bundle (bad magic)".into()));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(ClassifierError::ModelLoad(format!(
                "Unsupported bundle version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }

        let meta_len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
        let meta_end = HEADER_LEN
            .checked_add(meta_len)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                ClassifierError::ModelLoad(format!(
                    "Metadata length {} exceeds bundle size {}",
                    meta_len,
                    bytes.len()
                ))
            })?;

        let metadata: BundleMetadata = serde_json::from_slice(&bytes[HEADER_LEN..meta_end])
            .map_err(|e| ClassifierError::ModelLoad(format!("Malformed bundle metadata: {}", e)))?;
        metadata.validate()?;

        let model = &bytes[meta_end..];
        if model.is_empty() {
            return Err(ClassifierError::ModelLoad("Bundle contains no model bytes".into()));
        }
        debug!(
            "Decoded bundle: {} metadata bytes, {} model bytes, {} labels",
            meta_len,
            model.len(),
            metadata.labels.len()
        );
        Ok((metadata, model))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ClassifierError> {
        let (metadata, model) = Self::split(bytes)?;
        Ok(Self::new(metadata, model.to_vec()))
    }

    pub fn encode(&self) -> Result<Vec<u8>, ClassifierError> {
        let meta = serde_json::to_vec(&self.metadata)
            .map_err(|e| ClassifierError::ModelLoad(format!("Failed to serialize metadata: {}", e)))?;
        let meta_len = u32::try_from(meta.len())
            .map_err(|_| ClassifierError::ModelLoad("Bundle metadata is too large".into()))?;

        let mut out = Vec::with_capacity(HEADER_LEN + meta.len() + self.model.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&meta_len.to_le_bytes());
        out.extend_from_slice(&meta);
        out.extend_from_slice(&self.model);
        Ok(out)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ClassifierError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = self.encode()?;
        fs::write(path, &bytes)?;
        info!("Wrote {} byte bundle to {:?}", bytes.len(), path);
        Ok(())
    }
}
