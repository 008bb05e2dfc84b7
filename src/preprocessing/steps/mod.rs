//! Individual preprocessing steps

pub mod blur;
pub mod brightness;
pub mod contrast;
pub mod denoise;
pub mod grayscale;
pub mod resize;
pub mod sharpen;
pub mod threshold;

use crate::error::PipelineError;
use image::{DynamicImage, GrayImage, Luma};

/// Interpolate from `degenerate` towards `pixel` by `factor`; factors above
/// 1.0 extrapolate away from the degenerate value. Truncates, then saturates.
#[inline]
pub(crate) fn blend(degenerate: f32, pixel: f32, factor: f32) -> u8 {
    let value = degenerate + factor * (pixel - degenerate);
    if value <= 0.0 {
        0
    } else if value >= 255.0 {
        255
    } else {
        value as u8
    }
}

/// Take the single-channel buffer out of a step's input, rejecting empty images
pub(crate) fn require_luma(image: DynamicImage, step: &str) -> Result<GrayImage, PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::Transform(format!(
            "{} received a {}x{} image",
            step,
            image.width(),
            image.height()
        )));
    }
    Ok(image.into_luma8())
}

/// Apply `f` to every pixel of a grayscale image
pub(crate) fn map_luma(image: &GrayImage, f: impl Fn(u8) -> u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([f(image.get_pixel(x, y).0[0])])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_saturates_and_truncates() {
        assert_eq!(blend(100.0, 200.0, 2.0), 255);
        assert_eq!(blend(100.0, 10.0, 2.0), 0);
        assert_eq!(blend(0.0, 101.0, 1.5), 151);
        assert_eq!(blend(50.0, 50.0, 2.0), 50);
    }

    #[test]
    fn test_require_luma_rejects_empty_image() {
        let err = require_luma(DynamicImage::ImageLuma8(GrayImage::new(0, 7)), "test").unwrap_err();
        assert!(matches!(err, PipelineError::Transform(_)));
    }
}
