//! Individual preprocessing steps; `pipeline::STEPS` fixes their order

pub mod contrast;
pub mod grayscale;
pub mod resize;
pub mod threshold;
