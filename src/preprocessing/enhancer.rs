//! Stage 2: grayscale, contrast, sharpness, brightness, then median filter

use super::pipeline::{run_step, StepTiming};
use super::steps;
use crate::artifact::{ArtifactContext, ProcessingArtifact, Slot};
use crate::error::PipelineError;
use image::DynamicImage;

/// Enhance the resampled artifact into the `enhanced` slot
pub fn run(
    input: &ProcessingArtifact,
    ctx: &ArtifactContext,
    timings: &mut Vec<StepTiming>,
) -> Result<ProcessingArtifact, PipelineError> {
    let image = apply(input.image.clone(), timings)?;
    ctx.store(Slot::Enhanced, image)
}

/// Run the enhancement steps. Grayscale comes first so the multipliers act
/// on luma; the median filter comes last to clean up what they amplified.
/// Output is always `Luma8`.
pub fn apply(
    image: DynamicImage,
    timings: &mut Vec<StepTiming>,
) -> Result<DynamicImage, PipelineError> {
    let img = run_step("grayscale", image, timings, steps::grayscale::apply)?;
    let img = run_step("contrast", img, timings, steps::contrast::apply)?;
    let img = run_step("sharpen", img, timings, steps::sharpen::apply)?;
    let img = run_step("brightness", img, timings, steps::brightness::apply)?;
    run_step("denoise", img, timings, steps::denoise::apply)
}
