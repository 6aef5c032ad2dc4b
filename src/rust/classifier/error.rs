use ort::Error as OrtError;
use std::io;
use std::path::PathBuf;

/// Represents the different types of errors that can occur while loading a model or classifying text.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The named asset could not be found in any asset root
    #[error("Resource not found: {}", .0.display())]
    ResourceNotFound(PathBuf),
    /// The bytes are not a valid bundle or the engine rejected the model
    #[error("Model load error: {0}")]
    ModelLoad(String),
    /// The in-memory buffer is empty or does not contain a valid model
    #[error("Invalid buffer: {0}")]
    InvalidBuffer(String),
    /// The engine failed while running the forward pass
    #[error("Inference error: {0}")]
    Inference(String),
    /// Error occurred while loading or using the tokenizer
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
    #[error("Input text cannot be empty")]
    EmptyInput,
    /// The model handle was released and can no longer run
    #[error("Model handle has been released")]
    Released,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ClassifierError {
    /// Reports every load failure of an in-memory buffer as an invalid buffer.
    pub(crate) fn into_invalid_buffer(self) -> Self {
        match self {
            Self::ModelLoad(msg) | Self::Tokenizer(msg) => Self::InvalidBuffer(msg),
            other => other,
        }
    }
}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelLoad(err.to_string())
    }
}
