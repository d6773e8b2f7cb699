//! Image preprocessing module for OCR enhancement
//!
//! Normalizes raw images (grayscale, contrast, binarization, resolution
//! floor) before they reach a text recognizer.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Preprocessed, Preprocessor, StepTiming};
