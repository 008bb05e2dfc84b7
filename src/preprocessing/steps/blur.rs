use super::require_luma;
use crate::error::PipelineError;
use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;

/// Kernel size of the pre-threshold smoothing pass
pub const BLUR_KERNEL_SIZE: usize = 5;

/// Single-channel image with unquantized values
pub type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Apply a 5x5 Gaussian blur with automatically derived sigma.
///
/// Borders are reflected (`gfedcb|abcdefgh|gfedcba`) rather than replicated,
/// so the image is padded before filtering and cropped afterwards.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, PipelineError> {
    let gray = require_luma(image, "blur")?;
    let radius = (BLUR_KERNEL_SIZE / 2) as u32;

    let padded = pad_reflect_101(&gray, radius);
    let blurred = separable_filter_equal(&padded, &gaussian_kernel(BLUR_KERNEL_SIZE));

    let out = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([round_to_u8(blurred.get_pixel(x + radius, y + radius).0[0])])
    });
    Ok(DynamicImage::ImageLuma8(out))
}

/// Sigma used when none is given: `0.3 * ((size - 1) * 0.5 - 1) + 0.8`
pub fn auto_sigma(size: usize) -> f64 {
    0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian kernel of odd `size`.
///
/// Sizes up to 7 use the classic binomial-like tables, larger sizes sample
/// the Gaussian at [`auto_sigma`].
pub fn gaussian_kernel(size: usize) -> Vec<f32> {
    match size {
        1 => vec![1.0],
        3 => vec![0.25, 0.5, 0.25],
        5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
        7 => vec![
            0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125,
        ],
        _ => {
            let sigma = auto_sigma(size);
            let center = (size as f64 - 1.0) / 2.0;
            let raw: Vec<f64> = (0..size)
                .map(|i| {
                    let d = i as f64 - center;
                    (-(d * d) / (2.0 * sigma * sigma)).exp()
                })
                .collect();
            let total: f64 = raw.iter().sum();
            raw.into_iter().map(|w| (w / total) as f32).collect()
        }
    }
}

/// Index into a row of `len` pixels, reflecting without repeating the edge
pub fn reflect_101(i: i64, len: u32) -> u32 {
    let n = len as i64;
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let i = i.rem_euclid(period);
    (if i >= n { period - i } else { i }) as u32
}

/// Widen to float and pad every side by `radius` reflected pixels
pub fn pad_reflect_101(image: &GrayImage, radius: u32) -> FloatImage {
    let (width, height) = image.dimensions();
    let r = radius as i64;

    FloatImage::from_fn(width + 2 * radius, height + 2 * radius, |x, y| {
        let sx = reflect_101(x as i64 - r, width);
        let sy = reflect_101(y as i64 - r, height);
        Luma([image.get_pixel(sx, sy).0[0] as f32])
    })
}

/// Widen to float without padding
pub fn to_float(image: &GrayImage) -> FloatImage {
    FloatImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).0[0] as f32])
    })
}

/// Round to nearest and saturate
#[inline]
pub fn round_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
