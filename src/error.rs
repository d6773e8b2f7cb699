use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// The input could not be opened as a PDF or an image. This is the only
    /// error `Pipeline::process` propagates to its caller.
    #[error("Failed to open document '{path}': {detail}")]
    DocumentOpen { path: PathBuf, detail: String },

    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Unknown OCR engine '{name}' (available: {available})")]
    UnknownEngine { name: String, available: String },

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("Preprocessing failed: {0}")]
    PreprocessingError(String),

    #[error("Failed to recognize text: {0}")]
    RecognitionError(String),

    #[error("Failed to write '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    pub(crate) fn open(path: impl Into<PathBuf>, detail: impl std::fmt::Display) -> Self {
        ExtractError::DocumentOpen {
            path: path.into(),
            detail: detail.to_string(),
        }
    }
}
