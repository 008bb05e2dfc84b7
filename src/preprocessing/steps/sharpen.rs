use super::{blend, require_luma};
use crate::error::PipelineError;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::filter3x3;

/// Sharpness multiplier used by the enhancer
pub const SHARPNESS_FACTOR: f32 = 2.0;

/// `[1 1 1; 1 5 1; 1 1 1]`, normalized by its sum
const SMOOTH_KERNEL: [u32; 9] = [1, 1, 1, 1, 5, 1, 1, 1, 1];
const SMOOTH_TOTAL: u32 = 13;

/// Enhance sharpness by extrapolating away from a smoothed copy
pub fn apply(image: DynamicImage) -> Result<DynamicImage, PipelineError> {
    let gray = require_luma(image, "sharpen")?;
    Ok(DynamicImage::ImageLuma8(adjust(&gray, SHARPNESS_FACTOR)))
}

/// `out = smooth + factor * (p - smooth)`
pub fn adjust(image: &GrayImage, factor: f32) -> GrayImage {
    let smooth = smooth3x3(image);

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y).0[0] as f32;
        let s = smooth.get_pixel(x, y).0[0] as f32;
        Luma([blend(s, p, factor)])
    })
}

/// `[1 1 1; 1 5 1; 1 1 1] / 13` smoothing, rounded. Border pixels are copied.
fn smooth3x3(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let sums = filter3x3::<_, u32, u32>(image, &SMOOTH_KERNEL);

    GrayImage::from_fn(width, height, |x, y| {
        if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
            *image.get_pixel(x, y)
        } else {
            let sum = sums.get_pixel(x, y).0[0];
            Luma([((sum + SMOOTH_TOTAL / 2) / SMOOTH_TOTAL) as u8])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sharpen_enhances_edges() {
        // Create image with an edge (left half dark, right half light)
        let img = GrayImage::from_fn(20, 10, |x, _| {
            if x < 10 {
                Luma([50])
            } else {
                Luma([200])
            }
        });

        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        let result_gray = result.to_luma8();

        let edge_left = result_gray.get_pixel(9, 5).0[0];
        let edge_right = result_gray.get_pixel(10, 5).0[0];

        let original_diff = 200i32 - 50;
        let result_diff = (edge_right as i32 - edge_left as i32).abs();

        assert!(
            result_diff >= original_diff,
            "Edge should be enhanced: {} >= {}",
            result_diff,
            original_diff
        );
    }

    #[test]
    fn test_sharpen_keeps_flat_regions() {
        let img = GrayImage::from_pixel(8, 8, Luma([90]));
        let result = adjust(&img, SHARPNESS_FACTOR);
        assert!(result.pixels().all(|p| p.0[0] == 90));
    }

    #[test]
    fn test_smoothing_copies_border_and_rounds_interior() {
        let mut img = GrayImage::from_pixel(5, 5, Luma([0]));
        img.put_pixel(2, 2, Luma([13]));
        img.put_pixel(0, 0, Luma([200]));

        let smooth = smooth3x3(&img);

        // (5 * 13) / 13
        assert_eq!(smooth.get_pixel(2, 2).0[0], 5);
        // 13 / 13
        assert_eq!(smooth.get_pixel(1, 2).0[0], 1);
        // (200 + 13) / 13 rounds to 16
        assert_eq!(smooth.get_pixel(1, 1).0[0], 16);
        assert_eq!(smooth.get_pixel(0, 0).0[0], 200);
        assert_eq!(smooth.get_pixel(4, 2).0[0], 0);
    }
}
