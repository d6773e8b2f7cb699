use std::path::PathBuf;
use std::time::Duration;

/// Directory `save_text` writes into unless configured otherwise
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default language for OCR
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Extraction configuration, fixed for the lifetime of a `Pipeline`
#[derive(Debug, Clone)]
pub struct Config {
    /// OCR target language (e.g., "eng", "spa", "deu")
    pub language: String,
    /// OCR engine name ("ocrs" or "leptess"); `None` picks the first compiled in
    pub engine: Option<String>,
    /// Maximum number of images recognized at once
    pub concurrency: usize,
    /// Upper bound for a single image's preprocessing + recognition
    pub ocr_timeout: Option<Duration>,
    /// Directory extracted text is saved into
    pub output_dir: PathBuf,
    /// Path to tessdata directory (leptess only)
    pub tessdata_path: Option<String>,
}

impl Config {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Set the fan-out width; zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = Some(timeout);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            engine: None,
            concurrency: available_concurrency(),
            ocr_timeout: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            tessdata_path: None,
        }
    }
}

/// Number of processing units on the host, at least 1
pub fn available_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
