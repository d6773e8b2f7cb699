//! Extract text from PDF documents and images.
//!
//! The embedded text layer of a PDF is used when present. Otherwise every
//! raster image in the document (or the image file itself) is preprocessed
//! and run through an OCR engine in parallel, and the fragments are joined
//! in encounter order.
//!
//! ```rust,no_run
//! use pdf_ocr_extract::{Config, Pipeline};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::from_config(Config::default().with_language("eng"))?;
//! let text = pipeline.process("scan.pdf").await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod engines;
pub mod error;
pub mod extraction;
pub mod output;
pub mod preprocessing;

pub use config::Config;
pub use engine::TextRecognizer;
pub use error::ExtractError;
pub use extraction::{
    Extraction, OcrOutcome, Pipeline, TextSource, DOCUMENT_FAILURE_SENTINEL,
    IMAGE_FAILURE_SENTINEL,
};
pub use output::save_text;
pub use preprocessing::{Preprocessed, Preprocessor};
