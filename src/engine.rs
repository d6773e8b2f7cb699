use crate::error::ExtractError;
use image::DynamicImage;

/// Trait that all OCR engines must implement
///
/// Engines are shared across the OCR worker pool behind an `Arc`, so
/// `recognize` must not rely on per-call mutable state.
pub trait TextRecognizer: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize the text in an already preprocessed image
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, ExtractError>;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;
}
