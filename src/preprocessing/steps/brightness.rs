use super::{blend, map_luma, require_luma};
use crate::error::PipelineError;
use image::DynamicImage;

/// Brightness multiplier used by the enhancer
pub const BRIGHTNESS_FACTOR: f32 = 1.5;

/// Scale every pixel by the brightness factor (blend away from black)
pub fn apply(image: DynamicImage) -> Result<DynamicImage, PipelineError> {
    let gray = require_luma(image, "brightness")?;
    let brightened = map_luma(&gray, |p| blend(0.0, p as f32, BRIGHTNESS_FACTOR));
    Ok(DynamicImage::ImageLuma8(brightened))
}
