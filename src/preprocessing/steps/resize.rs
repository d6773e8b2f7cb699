use super::threshold;
use crate::error::ExtractError;
use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Images with either side below this are upscaled
pub const MIN_DIMENSION: u32 = 1000;

/// Double both sides of a low-resolution image, once
///
/// Lanczos3 rings at black/white edges, so the upscaled buffer is
/// binarized again at [`threshold::LEVEL`] to keep the output two-level.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, ExtractError> {
    let (width, height) = image.dimensions();

    if width >= MIN_DIMENSION && height >= MIN_DIMENSION {
        return Ok(image);
    }

    let (new_width, new_height) = width
        .checked_mul(2)
        .zip(height.checked_mul(2))
        .ok_or_else(|| {
            ExtractError::PreprocessingError(format!(
                "Cannot upscale {}x{} image: dimensions overflow",
                width, height
            ))
        })?;

    let upscaled = image.resize_exact(new_width, new_height, FilterType::Lanczos3);
    threshold::apply(upscaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_resize_doubles_small_image() {
        let img = GrayImage::new(100, 50);
        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!((result.width(), result.height()), (200, 100));
    }

    #[test]
    fn test_resize_doubles_when_one_side_is_small() {
        let img = GrayImage::new(1200, 400);
        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!((result.width(), result.height()), (2400, 800));
    }

    #[test]
    fn test_resize_skips_large_image() {
        let img = GrayImage::new(1000, 1000);
        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!((result.width(), result.height()), (1000, 1000));
    }

    #[test]
    fn test_resize_runs_once() {
        // 100 -> 200, still below the floor but not resized again
        let img = GrayImage::new(100, 100);
        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(result.width(), 200);
    }

    #[test]
    fn test_resize_rebinarizes_edges() {
        let img = GrayImage::from_fn(40, 40, |x, _| if x < 20 { Luma([0]) } else { Luma([255]) });

        let result = apply(DynamicImage::ImageLuma8(img)).unwrap().to_luma8();

        assert!(result.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(result.get_pixel(0, 0).0[0], 0);
        assert_eq!(result.get_pixel(79, 79).0[0], 255);
    }
}
