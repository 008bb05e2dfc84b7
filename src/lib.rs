//! OCR for photos and scans.
//!
//! An uploaded image is resampled, enhanced and binarized before it reaches
//! the OCR engine. Every request gets its own artifact directory, so
//! concurrent requests never see each other's intermediate images.

pub mod artifact;
pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod preprocessing;
pub mod recognition;
pub mod server;

pub use artifact::{ArtifactContext, ProcessingArtifact, Slot, SourceImage, Stage};
pub use engine::{EngineError, PageSegMode, RecognitionOptions, TextRecognizer};
pub use error::{FailureKind, OcrError, PipelineError, StageFailure};
pub use preprocessing::{Pipeline, PipelineResult};
