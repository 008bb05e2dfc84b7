use crate::artifact::{self, ArtifactContext, Slot};
use crate::config::Config;
use crate::engine::PageSegMode;
use crate::engines;
use crate::error::{OcrError, StageFailure};
use crate::preprocessing::{Pipeline, PipelineResult, StepTiming};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Longest pause between two sweeps of expired artifact directories
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: Arc<Config>,
}

/// Artifact URLs; empty when the stage did not produce one
#[derive(Serialize)]
pub struct ArtifactUrls {
    pub resampled: String,
    pub enhanced: String,
    pub binarized: String,
}

/// OCR response
#[derive(Serialize)]
pub struct OcrResponse {
    pub request_id: Uuid,
    pub text: String,
    pub success: bool,
    pub failure: Option<StageFailure>,
    pub artifacts: ArtifactUrls,
    pub processing_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: String,
    pub engine_description: String,
    pub available_engines: Vec<String>,
    pub language: String,
    pub page_mode: PageSegMode,
    pub scale: f64,
    pub max_pixels: u64,
    pub supported_formats: Vec<String>,
    pub max_file_size_bytes: usize,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    config.ensure_dirs()?;
    let recognizer = engines::build(&config)?;
    let pipeline = Pipeline::from_config(&config, recognizer)?;
    let addr = format!("{}:{}", config.host, config.port);

    if let Some(ttl) = config.artifact_ttl.filter(|_| config.persist_artifacts) {
        tokio::spawn(sweep_artifacts(config.processed_dir.clone(), ttl));
    }

    let app = router(AppState {
        pipeline: Arc::new(pipeline),
        config: Arc::new(config),
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically delete request artifact directories older than `ttl`
async fn sweep_artifacts(root: PathBuf, ttl: Duration) {
    let mut interval = tokio::time::interval(ttl.clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL));
    loop {
        interval.tick().await;
        let dir = root.clone();
        match tokio::task::spawn_blocking(move || artifact::sweep_expired(&dir, ttl)).await {
            Ok(Ok(0)) => {}
            Ok(Ok(removed)) => tracing::info!("Removed {} expired artifact directories", removed),
            Ok(Err(e)) => tracing::warn!("Artifact sweep of {:?} failed: {}", root, e),
            Err(e) => tracing::warn!("Artifact sweep task failed: {}", e),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/ocr", post(handle_ocr))
        .route("/processed/:request_id/:slot", get(handle_artifact))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )
        .with_state(state)
}

fn supported_formats() -> Vec<String> {
    [
        "image/png",
        "image/jpeg",
        "image/gif",
        "image/bmp",
        "image/webp",
        "image/tiff",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// File extension for an upload's content type
fn upload_extension(mime: &str) -> Result<&'static str, OcrError> {
    match mime {
        "image/png" => Ok(".png"),
        "image/jpeg" => Ok(".jpg"),
        "image/gif" => Ok(".gif"),
        "image/bmp" => Ok(".bmp"),
        "image/webp" => Ok(".webp"),
        "image/tiff" => Ok(".tiff"),
        // Sniffed from content by the decoder
        "application/octet-stream" => Ok(".upload"),
        m if m.starts_with("image/") => {
            tracing::warn!("Received file with content type: {}", m);
            Ok(".upload")
        }
        other => Err(OcrError::UnsupportedFormat(other.to_string())),
    }
}

fn artifact_url(result: &PipelineResult, slot: Slot) -> String {
    match result.artifact(slot) {
        Some(_) => format!("/processed/{}/{}", result.request_id, slot.file_name()),
        None => String::new(),
    }
}

/// Handle OCR requests
async fn handle_ocr(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>, OcrError> {
    let start = Instant::now();

    let mut file_data: Option<Bytes> = None;
    let mut content_type: Option<String> = None;

    // Parse multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| OcrError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        if field.name() == Some("file") {
            content_type = field.content_type().map(|s| s.to_string());
            file_data = Some(field.bytes().await.map_err(|e| {
                OcrError::InvalidRequest(format!("Failed to read file data: {}", e))
            })?);
        }
    }

    let data = file_data.ok_or(OcrError::MissingFile)?;

    if data.len() > state.config.max_file_size {
        return Err(OcrError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    let mime = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    let extension = upload_extension(&mime)?;

    let request_id = Uuid::new_v4();
    let upload_path = state
        .config
        .uploads_dir
        .join(format!("{}{}", request_id, extension));
    tokio::fs::write(&upload_path, &data)
        .await
        .map_err(|e| OcrError::Internal(format!("Failed to store upload: {}", e)))?;

    let ctx = ArtifactContext::with_id(
        &state.config.processed_dir,
        request_id,
        state.config.persist_artifacts,
    )
    .map_err(|e| OcrError::Internal(format!("Failed to create artifact directory: {}", e)))?;

    let pipeline = state.pipeline.clone();
    let source = upload_path.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.run_ocr(&source, &ctx)).await;

    // The upload is only needed while the pipeline runs
    if let Err(e) = tokio::fs::remove_file(&upload_path).await {
        tracing::warn!("Failed to remove upload {:?}: {}", upload_path, e);
    }
    let result = outcome.map_err(|e| OcrError::Internal(format!("OCR task failed: {}", e)))?;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Request {} completed in {}ms, success: {}, text length: {}",
        request_id,
        processing_time_ms,
        result.is_success(),
        result.text.len()
    );

    let artifacts = ArtifactUrls {
        resampled: artifact_url(&result, Slot::Resampled),
        enhanced: artifact_url(&result, Slot::Enhanced),
        binarized: artifact_url(&result, Slot::Binarized),
    };

    Ok(Json(OcrResponse {
        request_id,
        success: result.is_success(),
        text: result.text,
        failure: result.failure,
        artifacts,
        processing_time_ms,
        steps: result.steps,
    }))
}

/// Serve a stored artifact
async fn handle_artifact(
    State(state): State<AppState>,
    Path((request_id, slot)): Path<(String, String)>,
) -> Result<impl IntoResponse, OcrError> {
    let not_found = || OcrError::ArtifactNotFound(format!("{}/{}", request_id, slot));

    let id = Uuid::parse_str(&request_id).map_err(|_| not_found())?;
    let slot = Slot::parse(&slot).ok_or_else(not_found)?;
    let path = state
        .config
        .processed_dir
        .join(id.to_string())
        .join(slot.file_name());

    let bytes = tokio::fs::read(&path).await.map_err(|_| not_found())?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let recognizer = state.pipeline.recognizer();
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: recognizer.name().to_string(),
        engine_description: recognizer.description().to_string(),
        available_engines: engines::available().iter().map(|s| s.to_string()).collect(),
        language: state.pipeline.options().language.clone(),
        page_mode: state.pipeline.options().mode,
        scale: state.pipeline.scale(),
        max_pixels: state.pipeline.max_pixels(),
        supported_formats: supported_formats(),
        max_file_size_bytes: state.config.max_file_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_extension_rejects_pdf() {
        assert_eq!(upload_extension("image/png").unwrap(), ".png");
        assert_eq!(upload_extension("application/octet-stream").unwrap(), ".upload");
        assert!(matches!(
            upload_extension("application/pdf"),
            Err(OcrError::UnsupportedFormat(_))
        ));
    }
}
