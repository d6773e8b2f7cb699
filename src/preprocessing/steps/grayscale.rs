//! Luma conversion with ITU-R 601-2 weights (`L = R*299/1000 + G*587/1000 + B*114/1000`)
//!
//! `DynamicImage::to_luma8` uses Rec. 709 weights, which shifts coloured
//! pixels across the binarization threshold, so colour input is converted here.

use crate::error::ExtractError;
use image::{DynamicImage, GrayImage, Luma};

/// Convert image to single-channel grayscale
/// Every later step assumes Luma8 input
pub fn apply(image: DynamicImage) -> Result<DynamicImage, ExtractError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ExtractError::PreprocessingError(format!(
            "Cannot preprocess empty image ({}x{})",
            image.width(),
            image.height()
        )));
    }

    match image {
        DynamicImage::ImageLuma8(_) => Ok(image),
        DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => Ok(DynamicImage::ImageLuma8(image.to_luma8())),
        other => Ok(DynamicImage::ImageLuma8(luma_601(&other))),
    }
}

fn luma_601(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        // 16.16 fixed point, rounded
        let l = (r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471 + 0x8000) >> 16;
        Luma([l as u8])
    })
}
