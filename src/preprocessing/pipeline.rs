use crate::error::ExtractError;
use image::DynamicImage;
use std::time::Instant;

use super::steps;

/// Timing information for a single preprocessing step
#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: &'static str,
    pub time_ms: u64,
}

/// Outcome of preprocessing one image
///
/// Preprocessing never fails the caller: when a step errors the original
/// image is handed back as `Fallback` so OCR can still run on it.
#[derive(Debug, Clone)]
pub enum Preprocessed {
    Enhanced {
        image: DynamicImage,
        steps: Vec<StepTiming>,
    },
    Fallback {
        image: DynamicImage,
        reason: String,
    },
}

impl Preprocessed {
    pub fn image(&self) -> &DynamicImage {
        match self {
            Preprocessed::Enhanced { image, .. } | Preprocessed::Fallback { image, .. } => image,
        }
    }

    pub fn into_image(self) -> DynamicImage {
        match self {
            Preprocessed::Enhanced { image, .. } | Preprocessed::Fallback { image, .. } => image,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Preprocessed::Fallback { .. })
    }
}

type Step = fn(DynamicImage) -> Result<DynamicImage, ExtractError>;

/// The fixed step chain, in application order
const STEPS: [(&str, Step); 4] = [
    ("grayscale", steps::grayscale::apply),
    ("contrast", steps::contrast::apply),
    ("threshold", steps::threshold::apply),
    ("resize", steps::resize::apply),
];

/// Stateless preprocessor; safe to use from any number of OCR workers
#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Run the full chain, falling back to the untouched input on any error
    pub fn preprocess(&self, image: DynamicImage) -> Preprocessed {
        let start = Instant::now();

        // Steps consume their input; keep the original for the fallback path
        match self.run_steps(image.clone()) {
            Ok((enhanced, steps)) => {
                tracing::debug!(
                    "Preprocessed {}x{} -> {}x{} in {}ms",
                    image.width(),
                    image.height(),
                    enhanced.width(),
                    enhanced.height(),
                    start.elapsed().as_millis()
                );
                Preprocessed::Enhanced {
                    image: enhanced,
                    steps,
                }
            }
            Err(e) => {
                tracing::warn!("Preprocessing failed, using original image: {}", e);
                Preprocessed::Fallback {
                    image,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn run_steps(
        &self,
        image: DynamicImage,
    ) -> Result<(DynamicImage, Vec<StepTiming>), ExtractError> {
        let mut timings = Vec::with_capacity(STEPS.len());
        let mut img = image;
        for (name, step_fn) in STEPS {
            img = self.run_step(name, img, &mut timings, step_fn)?;
        }
        Ok((img, timings))
    }

    fn run_step<F>(
        &self,
        name: &'static str,
        img: DynamicImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<DynamicImage, ExtractError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, ExtractError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        timings.push(StepTiming {
            name,
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        Ok(result)
    }
}
