use crate::artifact::Stage;
use crate::engine::EngineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced to HTTP clients
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            OcrError::UnsupportedFormat(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_FORMAT")
            }
            OcrError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            OcrError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            OcrError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            OcrError::ArtifactNotFound(_) => (StatusCode::NOT_FOUND, "ARTIFACT_NOT_FOUND"),
            OcrError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

/// Coarse classification of a pipeline failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Decode,
    Io,
    InvalidScale,
    TooLarge,
    Transform,
    EngineUnavailable,
    EngineRuntime,
    EngineTimeout,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Io => "io",
            Self::InvalidScale => "invalid_scale",
            Self::TooLarge => "too_large",
            Self::Transform => "transform",
            Self::EngineUnavailable => "engine_unavailable",
            Self::EngineRuntime => "engine_runtime",
            Self::EngineTimeout => "engine_timeout",
        }
    }
}

/// Failure of a single pipeline stage
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to decode source image: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scale factor must be finite and greater than zero, got {0}")]
    InvalidScale(f64),

    #[error("Image of {width}x{height} exceeds the {max_pixels} pixel limit")]
    TooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    #[error("Transform failed: {0}")]
    Transform(String),

    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("OCR engine failed: {0}")]
    EngineRuntime(String),

    #[error("OCR engine timed out after {0:?}")]
    EngineTimeout(std::time::Duration),
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Decode(_) => FailureKind::Decode,
            Self::Io(_) => FailureKind::Io,
            Self::InvalidScale(_) => FailureKind::InvalidScale,
            Self::TooLarge { .. } => FailureKind::TooLarge,
            Self::Transform(_) => FailureKind::Transform,
            Self::EngineUnavailable(_) => FailureKind::EngineUnavailable,
            Self::EngineRuntime(_) => FailureKind::EngineRuntime,
            Self::EngineTimeout(_) => FailureKind::EngineTimeout,
        }
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Self::Io(e),
            image::ImageError::Decoding(_) | image::ImageError::Unsupported(_) => {
                Self::Decode(err.to_string())
            }
            other => Self::Transform(other.to_string()),
        }
    }
}

impl From<EngineError> for PipelineError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(_) => Self::EngineUnavailable(err.to_string()),
            EngineError::Timeout(after) => Self::EngineTimeout(after),
            EngineError::Failed(_) | EngineError::Io(_) => Self::EngineRuntime(err.to_string()),
        }
    }
}

/// A pipeline error tagged with the stage that produced it
#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub kind: FailureKind,
    /// Full diagnostic message; logged, never rendered to HTTP clients
    #[serde(skip)]
    pub message: String,
}

impl StageFailure {
    pub fn new(stage: Stage, err: &PipelineError) -> Self {
        Self {
            stage,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_engine_errors_map_to_kinds() {
        let missing: PipelineError = EngineError::NotFound("tesseract".to_string()).into();
        assert_eq!(missing.kind(), FailureKind::EngineUnavailable);

        let failed: PipelineError = EngineError::Failed("exit status 1".to_string()).into();
        assert_eq!(failed.kind(), FailureKind::EngineRuntime);

        let slow: PipelineError = EngineError::Timeout(Duration::from_secs(3)).into();
        assert_eq!(slow.kind(), FailureKind::EngineTimeout);
    }

    #[test]
    fn test_stage_failure_hides_message_when_serialized() {
        let err = PipelineError::Decode("bad magic bytes".to_string());
        let failure = StageFailure::new(Stage::Resample, &err);
        let json = serde_json::to_value(&failure).unwrap();

        assert_eq!(json["stage"], "resample");
        assert_eq!(json["kind"], "decode");
        assert!(json.get("message").is_none());
        assert!(failure.message.contains("bad magic bytes"));
    }
}
