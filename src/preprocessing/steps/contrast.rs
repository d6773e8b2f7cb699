use crate::error::ExtractError;
use image::{DynamicImage, GrayImage, Luma};

/// Fixed contrast enhancement factor
pub const FACTOR: f32 = 2.0;

/// Enhance contrast by pushing every pixel away from the mean gray level
///
/// `out = mean + FACTOR * (p - mean)`, clamped to 0..=255. A factor of 1.0
/// is the identity; already-binary images saturate to themselves.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, ExtractError> {
    let gray = image.into_luma8();
    Ok(DynamicImage::ImageLuma8(enhance(&gray, FACTOR)))
}

fn enhance(gray: &GrayImage, factor: f32) -> GrayImage {
    let mean = mean_level(gray) as f32;
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let pixel = gray.get_pixel(x, y).0[0] as f32;
        let value = mean + factor * (pixel - mean);
        Luma([value.clamp(0.0, 255.0) as u8])
    })
}

/// Mean intensity, rounded to the nearest level
fn mean_level(gray: &GrayImage) -> u8 {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return 0;
    }
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    ((sum as f64 / count as f64) + 0.5) as u8
}
