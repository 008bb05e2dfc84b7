use crate::error::PipelineError;
use image::{imageops::FilterType, DynamicImage};

/// Default upsampling factor
pub const DEFAULT_SCALE: f64 = 2.0;

/// Default ceiling on the pixel count of a source or resampled image
pub const DEFAULT_MAX_PIXELS: u64 = 50_000_000;

/// Reject images with more than `max_pixels` pixels
pub fn check_pixel_budget(width: u32, height: u32, max_pixels: u64) -> Result<(), PipelineError> {
    if width as u64 * height as u64 > max_pixels {
        return Err(PipelineError::TooLarge {
            width,
            height,
            max_pixels,
        });
    }
    Ok(())
}

/// Output dimensions for `scale`: `round(w * scale)` x `round(h * scale)`,
/// at most `max_pixels` in total
pub fn target_dimensions(
    width: u32,
    height: u32,
    scale: f64,
    max_pixels: u64,
) -> Result<(u32, u32), PipelineError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(PipelineError::InvalidScale(scale));
    }

    let new_width = (width as f64 * scale).round();
    let new_height = (height as f64 * scale).round();

    if new_width < 1.0 || new_height < 1.0 {
        return Err(PipelineError::Transform(format!(
            "scaling {}x{} by {} yields an empty image",
            width, height, scale
        )));
    }
    if new_width > u32::MAX as f64 || new_height > u32::MAX as f64 {
        return Err(PipelineError::TooLarge {
            width: new_width.min(u32::MAX as f64) as u32,
            height: new_height.min(u32::MAX as f64) as u32,
            max_pixels,
        });
    }

    let (new_width, new_height) = (new_width as u32, new_height as u32);
    check_pixel_budget(new_width, new_height, max_pixels)?;
    Ok((new_width, new_height))
}

/// Upsample with Lanczos3, keeping the color type of the input
pub fn apply(
    image: &DynamicImage,
    scale: f64,
    max_pixels: u64,
) -> Result<DynamicImage, PipelineError> {
    let (new_width, new_height) =
        target_dimensions(image.width(), image.height(), scale, max_pixels)?;

    if (new_width, new_height) == (image.width(), image.height()) {
        return Ok(image.clone());
    }

    Ok(image.resize_exact(new_width, new_height, FilterType::Lanczos3))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};

    #[test]
    fn test_resize_doubles_dimensions() {
        let img = RgbImage::new(100, 50);
        let result =
            apply(&DynamicImage::ImageRgb8(img), DEFAULT_SCALE, DEFAULT_MAX_PIXELS).unwrap();
        assert_eq!((result.width(), result.height()), (200, 100));
        assert_eq!(result.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_resize_rounds_fractional_dimensions() {
        let img = GrayImage::new(3, 5);
        let result = apply(&DynamicImage::ImageLuma8(img), 1.5, DEFAULT_MAX_PIXELS).unwrap();
        // 4.5 rounds away from zero, 7.5 likewise
        assert_eq!((result.width(), result.height()), (5, 8));
    }

    #[test]
    fn test_scale_one_keeps_dimensions() {
        let img = GrayImage::new(37, 11);
        let result = apply(&DynamicImage::ImageLuma8(img), 1.0, DEFAULT_MAX_PIXELS).unwrap();
        assert_eq!((result.width(), result.height()), (37, 11));
    }

    #[test]
    fn test_invalid_scale_fails_fast() {
        for scale in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let err = target_dimensions(10, 10, scale, DEFAULT_MAX_PIXELS).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidScale(_)), "scale {}", scale);
        }
    }

    #[test]
    fn test_scale_collapsing_to_zero_is_transform_error() {
        let err = target_dimensions(1, 1, 0.1, DEFAULT_MAX_PIXELS).unwrap_err();
        assert!(matches!(err, PipelineError::Transform(_)));
    }

    #[test]
    fn test_huge_scale_exceeds_pixel_budget() {
        let err = target_dimensions(4, 4, 1.0e6, DEFAULT_MAX_PIXELS).unwrap_err();
        assert!(matches!(err, PipelineError::TooLarge { .. }), "got {:?}", err);

        let err = target_dimensions(4, 4, 1.0e300, DEFAULT_MAX_PIXELS).unwrap_err();
        assert!(matches!(err, PipelineError::TooLarge { .. }), "got {:?}", err);
    }

    #[test]
    fn test_pixel_budget_is_inclusive() {
        assert_eq!(target_dimensions(10, 10, 2.0, 400).unwrap(), (20, 20));
        assert!(target_dimensions(10, 10, 2.0, 399).is_err());
    }
}
