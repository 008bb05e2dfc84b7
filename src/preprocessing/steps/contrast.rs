use super::{blend, map_luma, require_luma};
use crate::error::PipelineError;
use image::{DynamicImage, GrayImage};

/// Contrast multiplier used by the enhancer
pub const CONTRAST_FACTOR: f32 = 2.0;

/// Stretch contrast around the image's own mean
pub fn apply(image: DynamicImage) -> Result<DynamicImage, PipelineError> {
    let gray = require_luma(image, "contrast")?;
    Ok(DynamicImage::ImageLuma8(adjust(&gray, CONTRAST_FACTOR)))
}

/// `out = mean + factor * (p - mean)`, with the mean rounded to an integer
pub fn adjust(image: &GrayImage, factor: f32) -> GrayImage {
    let mean = mean_luma(image) as f32;
    map_luma(image, |p| blend(mean, p as f32, factor))
}

/// Mean pixel value, rounded half up
fn mean_luma(image: &GrayImage) -> u8 {
    let count = image.width() as u64 * image.height() as u64;
    if count == 0 {
        return 0;
    }
    let sum: u64 = image.pixels().map(|p| p.0[0] as u64).sum();
    ((sum * 2 + count) / (count * 2)) as u8
}
