use super::{binarizer, enhancer, resampler, steps};
use crate::artifact::{ArtifactContext, ProcessingArtifact, Slot, Stage};
use crate::config::Config;
use crate::engine::{RecognitionOptions, TextRecognizer};
use crate::error::{PipelineError, StageFailure};
use crate::recognition;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Timing information for a single processing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// The three preprocessing artifacts of one request
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub resampled: ProcessingArtifact,
    pub enhanced: ProcessingArtifact,
    pub binarized: ProcessingArtifact,
}

/// Successful end-to-end run
#[derive(Debug, Clone)]
pub struct Recognized {
    pub text: String,
    pub artifacts: Preprocessed,
    pub steps: Vec<StepTiming>,
}

/// Outcome of [`Pipeline::run_ocr`]. Always produced, whatever failed.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub request_id: Uuid,
    /// Engine output, or empty when nothing was recognized
    pub text: String,
    pub resampled: Option<PathBuf>,
    pub enhanced: Option<PathBuf>,
    pub binarized: Option<PathBuf>,
    pub failure: Option<StageFailure>,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn artifact(&self, slot: Slot) -> Option<&Path> {
        match slot {
            Slot::Resampled => self.resampled.as_deref(),
            Slot::Enhanced => self.enhanced.as_deref(),
            Slot::Binarized => self.binarized.as_deref(),
        }
    }

    /// `(text, resampled, enhanced, binarized)` with empty strings for
    /// artifacts that were not produced
    pub fn into_tuple(self) -> (String, String, String, String) {
        let show = |p: Option<PathBuf>| p.map(|p| p.display().to_string()).unwrap_or_default();
        (
            self.text,
            show(self.resampled),
            show(self.enhanced),
            show(self.binarized),
        )
    }
}

/// Resample -> enhance -> binarize -> recognize
pub struct Pipeline {
    scale: f64,
    max_pixels: u64,
    recognizer: Arc<dyn TextRecognizer>,
    options: RecognitionOptions,
}

impl Pipeline {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, options: RecognitionOptions) -> Self {
        Self {
            scale: steps::resize::DEFAULT_SCALE,
            max_pixels: steps::resize::DEFAULT_MAX_PIXELS,
            recognizer,
            options,
        }
    }

    pub fn from_config(
        config: &Config,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Result<Self, PipelineError> {
        Ok(Self::new(recognizer, config.recognition_options())
            .with_scale(config.scale)?
            .with_max_pixels(config.max_pixels))
    }

    /// Set the upsampling factor. Non-positive or non-finite values are rejected.
    pub fn with_scale(mut self, scale: f64) -> Result<Self, PipelineError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(PipelineError::InvalidScale(scale));
        }
        self.scale = scale;
        Ok(self)
    }

    /// Cap the pixel count of both the decoded source and the resampled image
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn max_pixels(&self) -> u64 {
        self.max_pixels
    }

    pub fn options(&self) -> &RecognitionOptions {
        &self.options
    }

    pub fn recognizer(&self) -> &dyn TextRecognizer {
        self.recognizer.as_ref()
    }

    /// Run the three preprocessing stages, stopping at the first failure
    pub fn preprocess(
        &self,
        source: &Path,
        ctx: &ArtifactContext,
        timings: &mut Vec<StepTiming>,
    ) -> Result<Preprocessed, StageFailure> {
        let resampled = resampler::run(source, self.scale, self.max_pixels, ctx, timings)
            .map_err(|e| StageFailure::new(Stage::Resample, &e))?;
        let enhanced = enhancer::run(&resampled, ctx, timings)
            .map_err(|e| StageFailure::new(Stage::Enhance, &e))?;
        let binarized = binarizer::run(&enhanced, ctx, timings)
            .map_err(|e| StageFailure::new(Stage::Binarize, &e))?;

        Ok(Preprocessed {
            resampled,
            enhanced,
            binarized,
        })
    }

    fn recognize(
        &self,
        binarized: &ProcessingArtifact,
        timings: &mut Vec<StepTiming>,
    ) -> Result<String, StageFailure> {
        run_step("recognize", binarized, timings, |artifact| {
            recognition::recognize(self.recognizer.as_ref(), artifact, &self.options)
        })
        .map_err(|e| StageFailure::new(Stage::Recognize, &e))
    }

    /// Run every stage and report the first failure with its stage and kind
    pub fn try_run(
        &self,
        source: &Path,
        ctx: &ArtifactContext,
    ) -> Result<Recognized, StageFailure> {
        let mut steps = Vec::new();
        let artifacts = self.preprocess(source, ctx, &mut steps)?;
        let text = self.recognize(&artifacts.binarized, &mut steps)?;

        Ok(Recognized {
            text,
            artifacts,
            steps,
        })
    }

    /// Best-effort OCR. Never fails: a preprocessing failure yields empty text
    /// and no artifact references (anything already written is removed), a
    /// recognition failure yields empty text with the preprocessing artifacts
    /// still referenced.
    pub fn run_ocr(&self, source: &Path, ctx: &ArtifactContext) -> PipelineResult {
        let span = tracing::info_span!("ocr_request", request_id = %ctx.request_id());
        let _guard = span.enter();

        let start = Instant::now();
        let mut steps = Vec::new();

        let mut result = PipelineResult {
            request_id: ctx.request_id(),
            text: String::new(),
            resampled: None,
            enhanced: None,
            binarized: None,
            failure: None,
            total_time_ms: 0,
            steps: Vec::new(),
        };

        match self.preprocess(source, ctx, &mut steps) {
            Err(failure) => {
                log_failure(&failure);
                ctx.discard();
                result.failure = Some(failure);
            }
            Ok(artifacts) => {
                result.resampled = artifacts.resampled.path.clone();
                result.enhanced = artifacts.enhanced.path.clone();
                result.binarized = artifacts.binarized.path.clone();

                match self.recognize(&artifacts.binarized, &mut steps) {
                    Ok(text) => result.text = text,
                    Err(failure) => {
                        log_failure(&failure);
                        result.failure = Some(failure);
                    }
                }
            }
        }

        result.total_time_ms = start.elapsed().as_millis() as u64;
        result.steps = steps;

        tracing::info!(
            "OCR pipeline finished in {}ms (success: {}, text length: {})",
            result.total_time_ms,
            result.is_success(),
            result.text.len()
        );
        result
    }
}

fn log_failure(failure: &StageFailure) {
    tracing::warn!(
        stage = %failure.stage,
        kind = failure.kind.as_str(),
        "OCR pipeline stopped: {}",
        failure.message
    );
}

/// Run one step and record how long it took
pub(crate) fn run_step<I, O, F>(
    name: &str,
    input: I,
    timings: &mut Vec<StepTiming>,
    step_fn: F,
) -> Result<O, PipelineError>
where
    F: FnOnce(I) -> Result<O, PipelineError>,
{
    let step_start = Instant::now();
    let result = step_fn(input)?;
    let time_ms = step_start.elapsed().as_millis() as u64;
    tracing::debug!("Step {} took {}ms", name, time_ms);
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms,
    });
    Ok(result)
}
