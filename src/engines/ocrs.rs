//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use.

use super::models::ensure_cached;
use crate::config::Config;
use crate::engine::TextRecognizer;
use crate::error::ExtractError;
use image::DynamicImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// OCR Engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Create a new OCR processor, downloading models if needed
    pub fn new(config: &Config) -> Result<Self, ExtractError> {
        if !is_supported_language(&config.language) {
            tracing::warn!(
                "ocrs only ships an English model; language '{}' will be read as 'eng'",
                config.language
            );
        }

        let detection_model_path = ensure_cached(DETECTION_MODEL_URL, None, "text-detection.rten")?;
        let recognition_model_path =
            ensure_cached(RECOGNITION_MODEL_URL, None, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            ExtractError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            ExtractError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            ExtractError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl TextRecognizer for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies required"
    }

    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, ExtractError> {
        if !is_supported_language(language) {
            tracing::debug!("ocrs ignoring language '{}'", language);
        }

        // ImageSource::from_bytes expects packed RGB8 (HWC)
        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            ExtractError::RecognitionError(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self.engine.prepare_input(img_source).map_err(|e| {
            ExtractError::RecognitionError(format!("Failed to prepare input: {}", e))
        })?;

        let word_rects = self.engine.detect_words(&ocr_input).map_err(|e| {
            ExtractError::RecognitionError(format!("Failed to detect words: {}", e))
        })?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| {
                ExtractError::RecognitionError(format!("Failed to recognize text: {}", e))
            })?;

        Ok(join_lines(line_texts.iter().filter_map(|line| {
            line.as_ref()
                .map(|line| line.words().map(|word| word.to_string()).collect::<Vec<String>>())
        })))
    }

    fn supported_languages(&self) -> Vec<String> {
        // ocrs currently only supports English/Latin alphabet
        vec!["eng".to_string()]
    }
}

fn is_supported_language(language: &str) -> bool {
    language.split('+').all(|lang| lang == "eng")
}

/// One output line per recognized text line, words separated by a space
fn join_lines<I>(lines: I) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    lines
        .into_iter()
        .map(|words| words.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}
