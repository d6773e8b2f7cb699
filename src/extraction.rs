//! Extraction pipeline: embedded text first, parallel OCR as the fallback
//!
//! ```text
//! open ─► embedded text? ──yes──► return it unchanged
//!                 │
//!                 no
//!                 ▼
//!          extract images ─► [preprocess + recognize] × N (bounded, ordered)
//!                 │
//!                 ▼
//!              assemble
//! ```

use crate::config::Config;
use crate::document::Document;
use crate::engine::TextRecognizer;
use crate::engines;
use crate::error::ExtractError;
use crate::preprocessing::Preprocessor;
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Text used for an image slot whose OCR failed or timed out
pub const IMAGE_FAILURE_SENTINEL: &str = "could not extract text from the image";

/// Returned when neither the text layer nor OCR produced anything
pub const DOCUMENT_FAILURE_SENTINEL: &str =
    "could not extract text from the PDF nor perform OCR on the images";

pub const EMBEDDED_HEADER: &str = "[Embedded text extracted from PDF]";
pub const OCR_HEADER: &str = "[Text extracted from images]";

/// Result of recognizing one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    /// `enhanced` is false when preprocessing fell back to the raw image
    Recognized { text: String, enhanced: bool },
    Failed(String),
    TimedOut,
}

impl OcrOutcome {
    /// Text contributed to the OCR section
    pub fn text(&self) -> &str {
        match self {
            OcrOutcome::Recognized { text, .. } => text,
            OcrOutcome::Failed(_) | OcrOutcome::TimedOut => IMAGE_FAILURE_SENTINEL,
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, OcrOutcome::Recognized { .. })
    }
}

/// Which path produced a document's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Embedded,
    Ocr,
}

/// Structured result of one pipeline run
#[derive(Debug, Clone)]
pub struct Extraction {
    pub path: PathBuf,
    pub source: TextSource,
    pub page_count: usize,
    pub embedded_text: String,
    /// One entry per successfully decoded image, in encounter order
    pub ocr: Vec<OcrOutcome>,
}

impl Extraction {
    /// OCR fragments joined with newlines
    pub fn ocr_text(&self) -> String {
        self.ocr
            .iter()
            .map(OcrOutcome::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render the final text handed to the caller
    pub fn into_text(self) -> String {
        match self.source {
            TextSource::Embedded => self.embedded_text,
            TextSource::Ocr => {
                let ocr_text = self.ocr_text();
                let embedded = self.embedded_text.trim();
                if embedded.is_empty() && ocr_text.trim().is_empty() {
                    DOCUMENT_FAILURE_SENTINEL.to_string()
                } else {
                    format!("{EMBEDDED_HEADER}\n{embedded}\n\n{OCR_HEADER}\n{ocr_text}")
                }
            }
        }
    }
}

/// What the blocking loader found in a document
enum Loaded {
    Embedded {
        text: String,
        page_count: usize,
    },
    Images {
        embedded: String,
        images: Vec<DynamicImage>,
        page_count: usize,
    },
}

fn load(path: &Path) -> Result<Loaded, ExtractError> {
    let document = Document::open(path)?;
    let page_count = document.page_count();

    let text = document.embedded_text();
    if !text.trim().is_empty() {
        return Ok(Loaded::Embedded { text, page_count });
    }

    Ok(Loaded::Images {
        embedded: text,
        images: document.into_images(),
        page_count,
    })
}

/// Extraction pipeline bound to one recognizer and one configuration
pub struct Pipeline {
    recognizer: Arc<dyn TextRecognizer>,
    preprocessor: Preprocessor,
    config: Config,
}

impl Pipeline {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, config: Config) -> Self {
        Self {
            recognizer,
            preprocessor: Preprocessor::new(),
            config,
        }
    }

    /// Initialize the engine named in `config` and build a pipeline around it
    pub fn from_config(config: Config) -> Result<Self, ExtractError> {
        let recognizer = engines::create(&config)?;
        Ok(Self::new(recognizer, config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine_name(&self) -> &'static str {
        self.recognizer.name()
    }

    /// Extract all recoverable text from a PDF or image file.
    ///
    /// # Errors
    /// Only when the document cannot be opened. Per-image failures are
    /// folded into the output as sentinels.
    pub async fn process(&self, path: impl AsRef<Path>) -> Result<String, ExtractError> {
        self.process_with_language(path, &self.config.language).await
    }

    /// Same as [`Pipeline::process`] with a per-call OCR language
    pub async fn process_with_language(
        &self,
        path: impl AsRef<Path>,
        language: &str,
    ) -> Result<String, ExtractError> {
        Ok(self.extract(path, language).await?.into_text())
    }

    /// Run the pipeline and return the structured result
    pub async fn extract(
        &self,
        path: impl AsRef<Path>,
        language: &str,
    ) -> Result<Extraction, ExtractError> {
        let start = Instant::now();
        let path = path.as_ref().to_path_buf();
        info!("Processing {:?}", path);

        let load_path = path.clone();
        let loaded = tokio::task::spawn_blocking(move || load(&load_path))
            .await
            .map_err(|e| ExtractError::Internal(format!("Document loader task failed: {}", e)))??;

        let extraction = match loaded {
            Loaded::Embedded { text, page_count } => {
                info!(
                    "Extracted {} chars of embedded text from {:?} ({} pages)",
                    text.len(),
                    path,
                    page_count
                );
                Extraction {
                    path,
                    source: TextSource::Embedded,
                    page_count,
                    embedded_text: text,
                    ocr: Vec::new(),
                }
            }
            Loaded::Images {
                embedded,
                images,
                page_count,
            } => {
                info!(
                    "No embedded text in {:?}; running OCR on {} images",
                    path,
                    images.len()
                );
                let ocr = self.recognize_all(images, language).await;
                let failed = ocr.iter().filter(|o| o.is_failure()).count();
                if failed > 0 {
                    warn!("{} of {} images could not be recognized", failed, ocr.len());
                }
                Extraction {
                    path,
                    source: TextSource::Ocr,
                    page_count,
                    embedded_text: embedded,
                    ocr,
                }
            }
        };

        info!(
            "Finished {:?} via {:?} in {}ms",
            extraction.path,
            extraction.source,
            start.elapsed().as_millis()
        );
        Ok(extraction)
    }

    /// Preprocess and recognize every image on the blocking pool.
    ///
    /// At most `config.concurrency` images are in flight; results come back
    /// in input order regardless of completion order.
    pub async fn recognize_all(
        &self,
        images: Vec<DynamicImage>,
        language: &str,
    ) -> Vec<OcrOutcome> {
        let total = images.len();
        let concurrency = self.config.concurrency.max(1);
        debug!("Recognizing {} images with concurrency {}", total, concurrency);

        stream::iter(images.into_iter().enumerate().map(|(index, image)| {
            let recognizer = Arc::clone(&self.recognizer);
            let preprocessor = self.preprocessor;
            let language = language.to_string();
            let timeout = self.config.ocr_timeout;
            async move {
                let task = tokio::task::spawn_blocking(move || {
                    let prepared = preprocessor.preprocess(image);
                    let enhanced = !prepared.is_fallback();
                    recognizer
                        .recognize(prepared.image(), &language)
                        .map(|text| (text, enhanced))
                });

                let joined = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, task).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            // The blocking thread cannot be interrupted; it finishes unobserved
                            warn!("Image {}/{} timed out after {:?}", index + 1, total, limit);
                            return OcrOutcome::TimedOut;
                        }
                    },
                    None => task.await,
                };

                match joined {
                    Ok(Ok((text, enhanced))) => {
                        debug!("Image {}/{}: {} chars", index + 1, total, text.len());
                        OcrOutcome::Recognized { text, enhanced }
                    }
                    Ok(Err(e)) => {
                        warn!("Image {}/{}: {}", index + 1, total, e);
                        OcrOutcome::Failed(e.to_string())
                    }
                    Err(e) => {
                        warn!("Image {}/{}: OCR worker failed: {}", index + 1, total, e);
                        OcrOutcome::Failed(format!("OCR worker failed: {}", e))
                    }
                }
            }
        }))
        .buffered(concurrency)
        .collect()
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    struct EchoWidth;

    impl TextRecognizer for EchoWidth {
        fn name(&self) -> &'static str {
            "echo-width"
        }

        fn description(&self) -> &'static str {
            "Reports the width of the image it was given"
        }

        fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, ExtractError> {
            Ok(format!("{}:{}", language, image.width()))
        }

        fn supported_languages(&self) -> Vec<String> {
            vec!["eng".to_string()]
        }
    }

    fn extraction(embedded: &str, ocr: Vec<OcrOutcome>) -> Extraction {
        Extraction {
            path: PathBuf::from("scan.pdf"),
            source: TextSource::Ocr,
            page_count: 1,
            embedded_text: embedded.to_string(),
            ocr,
        }
    }

    #[test]
    fn test_embedded_text_is_returned_unchanged() {
        let result = Extraction {
            path: PathBuf::from("doc.pdf"),
            source: TextSource::Embedded,
            page_count: 2,
            embedded_text: "  Page one\n\nPage two\n".to_string(),
            ocr: Vec::new(),
        };
        assert_eq!(result.into_text(), "  Page one\n\nPage two\n");
    }

    #[test]
    fn test_ocr_sections_are_assembled() {
        let result = extraction(
            "\n\n",
            vec![
                OcrOutcome::Recognized {
                    text: "first".to_string(),
                    enhanced: true,
                },
                OcrOutcome::Failed("engine crashed".to_string()),
                OcrOutcome::TimedOut,
            ],
        );
        assert_eq!(
            result.into_text(),
            format!(
                "{EMBEDDED_HEADER}\n\n\n{OCR_HEADER}\nfirst\n{IMAGE_FAILURE_SENTINEL}\n{IMAGE_FAILURE_SENTINEL}"
            )
        );
    }

    #[test]
    fn test_nothing_found_yields_sentinel() {
        assert_eq!(extraction("", Vec::new()).into_text(), DOCUMENT_FAILURE_SENTINEL);
        let blank = vec![OcrOutcome::Recognized {
            text: "  \n".to_string(),
            enhanced: true,
        }];
        assert_eq!(extraction(" ", blank).into_text(), DOCUMENT_FAILURE_SENTINEL);
    }

    #[test]
    fn test_recognize_all_preprocesses_and_uses_language() {
        let pipeline = Pipeline::new(Arc::new(EchoWidth), Config::default().with_concurrency(2));
        let images = vec![
            DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 10, Luma([255]))),
            DynamicImage::ImageLuma8(GrayImage::from_pixel(1200, 1000, Luma([0]))),
        ];

        let outcomes = tokio_test::block_on(pipeline.recognize_all(images, "spa"));

        let texts: Vec<_> = outcomes.iter().map(OcrOutcome::text).collect();
        assert_eq!(texts, ["spa:20", "spa:1200"]);
    }

    #[test]
    fn test_preprocessing_fallback_is_reported() {
        let pipeline = Pipeline::new(Arc::new(EchoWidth), Config::default());
        let images = vec![DynamicImage::ImageLuma8(GrayImage::new(0, 0))];

        let outcomes = tokio_test::block_on(pipeline.recognize_all(images, "eng"));

        assert_eq!(
            outcomes,
            vec![OcrOutcome::Recognized {
                text: "eng:0".to_string(),
                enhanced: false,
            }]
        );
    }
}
