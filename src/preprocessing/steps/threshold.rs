use crate::error::ExtractError;
use image::DynamicImage;
use imageproc::contrast::{threshold, ThresholdType};

/// Pixels strictly above this level become white, the rest black
pub const LEVEL: u8 = 128;

/// Binarize with a fixed global threshold
pub fn apply(image: DynamicImage) -> Result<DynamicImage, ExtractError> {
    let gray = image.into_luma8();
    let binarized = threshold(&gray, LEVEL, ThresholdType::Binary);
    Ok(DynamicImage::ImageLuma8(binarized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_threshold_binarizes_image() {
        let img = GrayImage::from_fn(50, 50, |x, _| Luma([(x as u8 * 5).min(255)]));

        let result = apply(DynamicImage::ImageLuma8(img)).unwrap().to_luma8();

        for pixel in result.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "Expected binary pixel, got {}",
                pixel.0[0]
            );
        }
    }

    #[test]
    fn test_threshold_boundary_is_strict() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([127 + x as u8]));

        let result = apply(DynamicImage::ImageLuma8(img)).unwrap().to_luma8();

        assert_eq!(result.get_pixel(0, 0).0[0], 0); // 127
        assert_eq!(result.get_pixel(1, 0).0[0], 0); // 128
        assert_eq!(result.get_pixel(2, 0).0[0], 255); // 129
    }
}
