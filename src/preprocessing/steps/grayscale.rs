use crate::error::PipelineError;
use image::{DynamicImage, GrayImage, Luma};

/// Convert image to single-channel grayscale with the ITU-R BT.601 luma
/// weights: `L = (299 R + 587 G + 114 B) / 1000`, alpha ignored.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, PipelineError> {
    if let DynamicImage::ImageLuma8(_) = image {
        return Ok(image);
    }

    // Wider single-channel images only need depth reduction
    if image.color().channel_count() <= 2 {
        return Ok(DynamicImage::ImageLuma8(image.into_luma8()));
    }

    let rgb = image.into_rgb8();
    let gray = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    });
    Ok(DynamicImage::ImageLuma8(gray))
}

/// BT.601 luma, rounded to nearest
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = r as u32 * 299 + g as u32 * 587 + b as u32 * 114;
    ((weighted + 500) / 1000) as u8
}
