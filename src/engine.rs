use image::GrayImage;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Tesseract page segmentation mode. Pages are always segmented
/// automatically; the enum is what `/info` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// Fully automatic page segmentation (psm 3)
    #[default]
    FullPage,
}

impl PageSegMode {
    pub fn psm(&self) -> u8 {
        match self {
            Self::FullPage => 3,
        }
    }
}

/// Fixed recognition configuration handed to the engine
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionOptions {
    pub mode: PageSegMode,
    /// Tesseract language code, e.g. "eng"
    pub language: String,
    /// Upper bound on a single recognition call
    pub timeout: Option<Duration>,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            mode: PageSegMode::FullPage,
            language: "eng".to_string(),
            timeout: Some(Duration::from_secs(60)),
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("OCR engine not found: {0}")]
    NotFound(String),

    #[error("OCR engine did not finish within {0:?}")]
    Timeout(Duration),

    #[error("OCR engine failed: {0}")]
    Failed(String),

    #[error("OCR engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait that all OCR engines must implement
pub trait TextRecognizer: Send + Sync {
    /// Returns the engine identifier (e.g., "tesseract-cli", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text in a binary image. The text is returned exactly as the engine produced it.
    fn recognize(
        &self,
        image: &GrayImage,
        options: &RecognitionOptions,
    ) -> Result<String, EngineError>;
}
