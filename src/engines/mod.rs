//! OCR engine implementations
//!
//! This module contains implementations of the TextRecognizer trait for
//! different OCR backends. Engines are conditionally compiled based on
//! feature flags.

#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
mod models;

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

use crate::config::Config;
use crate::engine::TextRecognizer;
use crate::error::ExtractError;
use std::sync::Arc;

/// Names of the engines compiled into this build, in preference order
pub fn available() -> Vec<&'static str> {
    let mut names = Vec::new();

    #[cfg(feature = "engine-ocrs")]
    names.push("ocrs");

    #[cfg(feature = "engine-leptess")]
    names.push("leptess");

    names
}

/// Initialize the engine named in `config`, or the first available one
pub fn create(config: &Config) -> Result<Arc<dyn TextRecognizer>, ExtractError> {
    let names = available();
    let name = match config.engine.as_deref() {
        Some(name) => name,
        None => names.first().copied().ok_or_else(|| {
            ExtractError::InitializationError(
                "No OCR engines available. Build with --features engine-ocrs or --features engine-leptess".to_string(),
            )
        })?,
    };

    match name {
        #[cfg(feature = "engine-ocrs")]
        "ocrs" => {
            tracing::info!("Initializing ocrs engine...");
            Ok(Arc::new(ocrs::OcrsEngine::new(config)?))
        }
        #[cfg(feature = "engine-leptess")]
        "leptess" => {
            tracing::info!("Initializing leptess engine...");
            Ok(Arc::new(leptess::LeptessEngine::new(config)?))
        }
        other => Err(ExtractError::UnknownEngine {
            name: other.to_string(),
            available: names.join(", "),
        }),
    }
}
