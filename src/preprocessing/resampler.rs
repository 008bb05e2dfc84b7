//! Stage 1: decode the upload and upsample it

use super::pipeline::{run_step, StepTiming};
use super::steps;
use crate::artifact::{ArtifactContext, ProcessingArtifact, Slot, SourceImage};
use crate::error::PipelineError;
use std::path::Path;

/// Decode the file at `source` and resample it. Both the source and the
/// resampled image must stay within `max_pixels`.
pub fn run(
    source: &Path,
    scale: f64,
    max_pixels: u64,
    ctx: &ArtifactContext,
    timings: &mut Vec<StepTiming>,
) -> Result<ProcessingArtifact, PipelineError> {
    let source = run_step("decode", (), timings, |_| {
        SourceImage::open(source, max_pixels)
    })?;
    resample(&source, scale, max_pixels, ctx, timings)
}

/// Upsample an already decoded source into the `resampled` slot
pub fn resample(
    source: &SourceImage,
    scale: f64,
    max_pixels: u64,
    ctx: &ArtifactContext,
    timings: &mut Vec<StepTiming>,
) -> Result<ProcessingArtifact, PipelineError> {
    tracing::debug!(
        "Resampling {:?} ({}x{}, {:?}, {:?}) by {}",
        source.path(),
        source.width(),
        source.height(),
        source.format(),
        source.color(),
        scale
    );
    let image = run_step("resize", source.image(), timings, |img| {
        steps::resize::apply(img, scale, max_pixels)
    })?;
    ctx.store(Slot::Resampled, image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::steps::resize::DEFAULT_MAX_PIXELS;
    use image::{DynamicImage, GrayImage, RgbImage};

    #[test]
    fn test_resample_does_not_touch_source() {
        let root = tempfile::tempdir().unwrap();
        let ctx = ArtifactContext::create(root.path(), true).unwrap();
        let source =
            SourceImage::from_image("in.png", DynamicImage::ImageRgb8(RgbImage::new(30, 20)));

        let artifact = resample(&source, 2.0, DEFAULT_MAX_PIXELS, &ctx, &mut Vec::new()).unwrap();

        assert_eq!((source.width(), source.height()), (30, 20));
        assert_eq!((artifact.width(), artifact.height()), (60, 40));
        assert_eq!(artifact.slot, Slot::Resampled);
        assert!(artifact.path.unwrap().exists());
    }

    #[test]
    fn test_unreadable_source_is_decode_or_io_error() {
        let root = tempfile::tempdir().unwrap();
        let ctx = ArtifactContext::create(root.path(), true).unwrap();
        let bogus = root.path().join("not-an-image.png");
        std::fs::write(&bogus, b"definitely not a png").unwrap();

        let err = run(&bogus, 2.0, DEFAULT_MAX_PIXELS, &ctx, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)), "got {:?}", err);

        let missing = root.path().join("missing.png");
        let err = run(&missing, 2.0, DEFAULT_MAX_PIXELS, &ctx, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)), "got {:?}", err);
    }

    #[test]
    fn test_oversized_source_is_rejected_before_decoding() {
        let root = tempfile::tempdir().unwrap();
        let ctx = ArtifactContext::create(root.path(), true).unwrap();
        let path = root.path().join("big.png");
        DynamicImage::ImageLuma8(GrayImage::new(40, 30)).save(&path).unwrap();

        let err = run(&path, 1.0, 1000, &ctx, &mut Vec::new()).unwrap_err();

        assert!(
            matches!(err, PipelineError::TooLarge { width: 40, height: 30, .. }),
            "got {:?}",
            err
        );
        assert!(!ctx.slot_path(Slot::Resampled).exists());
    }
}
