//! Image preprocessing for OCR
//!
//! Three stages run in a fixed order, each consuming the previous stage's
//! artifact: resample, enhance, binarize.

pub mod binarizer;
pub mod enhancer;
pub mod pipeline;
pub mod resampler;
pub mod steps;

pub use pipeline::{Pipeline, PipelineResult, Preprocessed, Recognized, StepTiming};
