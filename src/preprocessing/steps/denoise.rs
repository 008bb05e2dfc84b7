use super::require_luma;
use crate::error::PipelineError;
use image::DynamicImage;
use imageproc::filter::median_filter;

/// Apply median filter to remove impulse noise left by the enhancement steps
/// Median filter preserves edges better than Gaussian blur
pub fn apply(image: DynamicImage) -> Result<DynamicImage, PipelineError> {
    let gray = require_luma(image, "denoise")?;
    // 3x3 median filter (radius 1) - effective for salt-and-pepper noise
    let denoised = median_filter(&gray, 1, 1);
    Ok(DynamicImage::ImageLuma8(denoised))
}
