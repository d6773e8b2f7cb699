//! Leptess/Tesseract engine implementation
//!
//! Tesseract-based OCR engine. Better for noisy/messy images like phone photos
//! and the only engine that honours the configured language.
//! Uses tesseract-static crate for static linking (no system dependencies).
//! Downloads tessdata (training data) automatically on first use.

use super::models::{cache_root, ensure_cached};
use crate::config::Config;
use crate::engine::TextRecognizer;
use crate::error::ExtractError;
use image::DynamicImage;
use std::path::PathBuf;
use tesseract_static::tesseract::Tesseract;

/// Tesseract OCR Engine
///
/// A fresh `Tesseract` handle is created per call, so concurrent workers
/// never share recognizer state.
pub struct LeptessEngine {
    /// Path to tessdata directory
    tessdata_path: String,
}

impl LeptessEngine {
    /// Create a new Tesseract-based OCR engine
    pub fn new(config: &Config) -> Result<Self, ExtractError> {
        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(&config.language)?,
        };

        // Validate that tessdata is accessible by doing a test initialization
        let test_tess = Tesseract::new(Some(&tessdata_path), Some(&config.language)).map_err(|e| {
            ExtractError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;
        drop(test_tess);

        tracing::info!(
            "Leptess engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            config.language
        );

        Ok(Self { tessdata_path })
    }
}

impl TextRecognizer for LeptessEngine {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - better for noisy/messy images like phone photos"
    }

    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, ExtractError> {
        let bmp_data = encode_bmp(image)?;

        tracing::debug!(
            "Recognizing {}x{} image ({} bytes as BMP, language {})",
            image.width(),
            image.height(),
            bmp_data.len(),
            language
        );

        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(language)).map_err(|e| {
            ExtractError::RecognitionError(format!("Failed to create Tesseract: {}", e))
        })?;

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            ExtractError::RecognitionError(format!(
                "Failed to set image ({}x{}): {}",
                image.width(),
                image.height(),
                e
            ))
        })?;

        tess = tess
            .recognize()
            .map_err(|e| {
                ExtractError::RecognitionError(format!("Failed to recognize text: {}", e))
            })?;

        tess.get_text()
            .map_err(|e| ExtractError::RecognitionError(format!("Failed to get text: {}", e)))
    }

    fn supported_languages(&self) -> Vec<String> {
        installed_languages(&self.tessdata_path)
    }
}

/// Leptonica always reads BMP; binarized images are widened to RGB8 first
fn encode_bmp(image: &DynamicImage) -> Result<Vec<u8>, ExtractError> {
    let rgb_img = image.to_rgb8();
    let mut bmp_data = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut bmp_data);
    rgb_img
        .write_to(&mut cursor, image::ImageFormat::Bmp)
        .map_err(|e| ExtractError::RecognitionError(format!("Failed to convert to BMP: {}", e)))?;
    Ok(bmp_data)
}

/// Languages with a `.traineddata` file in the tessdata directory
fn installed_languages(tessdata_path: &str) -> Vec<String> {
    let mut languages: Vec<String> = std::fs::read_dir(tessdata_path)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| {
                    let name = entry.file_name().to_string_lossy().to_string();
                    name.strip_suffix(".traineddata").map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default();
    languages.sort();
    languages
}

/// Ensure tessdata for every `+`-joined language is available, downloading if needed
fn ensure_tessdata_available(language: &str) -> Result<String, ExtractError> {
    for lang in language.split('+').filter(|l| !l.is_empty()) {
        ensure_cached(
            &tessdata_url(lang),
            Some("tessdata"),
            &format!("{}.traineddata", lang),
        )?;
    }

    // Tesseract expects the directory, not the file
    let dir: PathBuf = cache_root().join("tessdata");
    dir.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| ExtractError::InitializationError("Invalid tessdata path".to_string()))
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // Use tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
