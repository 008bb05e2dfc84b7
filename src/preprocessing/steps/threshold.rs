use super::blur::{gaussian_kernel, round_to_u8, to_float};
use super::require_luma;
use crate::error::PipelineError;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::separable_filter_equal;

/// Adaptive threshold parameters
pub const BLOCK_SIZE: usize = 11;
pub const OFFSET: i32 = 2;

/// Apply adaptive thresholding against a Gaussian-weighted local mean.
/// Unlike a global cutoff this copes with uneven lighting across a photo.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, PipelineError> {
    let gray = require_luma(image, "threshold")?;
    Ok(DynamicImage::ImageLuma8(adaptive_gaussian_threshold(
        &gray, BLOCK_SIZE, OFFSET,
    )))
}

/// A pixel becomes 255 when it is brighter than its local mean minus
/// `offset`, otherwise 0. The local mean is rounded to 8 bits first and
/// replicates the edge pixels past the border.
pub fn adaptive_gaussian_threshold(img: &GrayImage, block_size: usize, offset: i32) -> GrayImage {
    let mean = separable_filter_equal(&to_float(img), &gaussian_kernel(block_size));

    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let pixel = img.get_pixel(x, y).0[0] as i32;
        let local = round_to_u8(mean.get_pixel(x, y).0[0]) as i32;
        if pixel > local - offset {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binarizes_image() {
        let img = GrayImage::from_fn(50, 50, |x, _| Luma([(x as u8 * 5).min(255)]));

        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        let result_gray = result.to_luma8();

        for pixel in result_gray.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "Expected binary pixel, got {}",
                pixel.0[0]
            );
        }
    }

    #[test]
    fn test_threshold_handles_text_pattern() {
        // Dark text on light background
        let mut img = GrayImage::from_pixel(50, 20, Luma([240]));
        for x in 10..40 {
            img.put_pixel(x, 10, Luma([20]));
        }

        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        let result_gray = result.to_luma8();

        assert_eq!(result_gray.get_pixel(25, 10).0[0], 0);
        assert_eq!(result_gray.get_pixel(25, 5).0[0], 255);
    }

    #[test]
    fn test_threshold_survives_lighting_gradient() {
        // Background darkens left to right; a stroke sits in the dark half
        let mut img = GrayImage::from_fn(60, 30, |x, _| Luma([220 - (x as u8 * 2)]));
        for y in 5..25 {
            img.put_pixel(45, y, Luma([img.get_pixel(45, y).0[0] - 60]));
        }

        let result = adaptive_gaussian_threshold(&img, BLOCK_SIZE, OFFSET);

        assert_eq!(result.get_pixel(45, 15).0[0], 0);
        assert_eq!(result.get_pixel(10, 15).0[0], 255);
        assert_eq!(result.get_pixel(52, 15).0[0], 255);
    }

    #[test]
    fn test_uniform_image_becomes_white() {
        let img = GrayImage::from_pixel(20, 20, Luma([255]));
        let result = adaptive_gaussian_threshold(&img, BLOCK_SIZE, OFFSET);
        assert!(result.pixels().all(|p| p.0[0] == 255));
    }
}
