//! Stage 3: Gaussian smoothing followed by adaptive thresholding

use super::pipeline::{run_step, StepTiming};
use super::steps;
use crate::artifact::{ArtifactContext, ProcessingArtifact, Slot};
use crate::error::PipelineError;
use image::DynamicImage;

/// Binarize the enhanced artifact into the `binarized` slot
pub fn run(
    input: &ProcessingArtifact,
    ctx: &ArtifactContext,
    timings: &mut Vec<StepTiming>,
) -> Result<ProcessingArtifact, PipelineError> {
    let image = apply(input.image.clone(), timings)?;
    ctx.store(Slot::Binarized, image)
}

/// Blur then threshold. Every output pixel is 0 or 255.
///
/// Feeding the output back in stays binary, but the blur sees hard edges the
/// second time round so the result can differ from the first pass.
pub fn apply(
    image: DynamicImage,
    timings: &mut Vec<StepTiming>,
) -> Result<DynamicImage, PipelineError> {
    let img = run_step("blur", image, timings, steps::blur::apply)?;
    run_step("threshold", img, timings, steps::threshold::apply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn assert_binary(image: &DynamicImage) {
        for pixel in image.to_luma8().pixels() {
            assert!(pixel.0[0] == 0 || pixel.0[0] == 255, "got {}", pixel.0[0]);
        }
    }

    fn noisy() -> DynamicImage {
        // Deterministic pseudo-random texture
        let mut state = 0x2545_f491_u32;
        DynamicImage::ImageLuma8(GrayImage::from_fn(64, 48, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            Luma([(state & 0xff) as u8])
        }))
    }

    #[test]
    fn test_binarizer_output_is_binary() {
        let result = apply(noisy(), &mut Vec::new()).unwrap();
        assert_binary(&result);
    }

    #[test]
    fn test_binarizing_twice_stays_binary() {
        let once = apply(noisy(), &mut Vec::new()).unwrap();
        let twice = apply(once, &mut Vec::new()).unwrap();
        // Not asserted equal to the first pass
        assert_binary(&twice);
    }

    #[test]
    fn test_binarizer_handles_one_pixel_image() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([10])));
        let result = apply(img, &mut Vec::new()).unwrap();
        assert_binary(&result);
    }
}
