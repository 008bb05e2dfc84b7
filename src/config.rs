use crate::engine::{PageSegMode, RecognitionOptions};
use crate::preprocessing::steps::resize::DEFAULT_MAX_PIXELS;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "photo-ocr-server")]
#[command(about = "OCR server that cleans up photos and scans before recognition")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "OCR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "OCR_PORT", default_value = "9292")]
    pub port: u16,

    /// Recognition language (Tesseract code, e.g. "eng", "deu")
    #[arg(long, env = "OCR_LANGUAGE", default_value = "eng")]
    pub language: String,

    /// Upsampling factor applied before enhancement
    #[arg(long, env = "OCR_SCALE", default_value = "2.0", value_parser = parse_scale)]
    pub scale: f64,

    /// Largest source or resampled image, in pixels
    #[arg(long, env = "OCR_MAX_PIXELS", default_value_t = DEFAULT_MAX_PIXELS)]
    pub max_pixels: u64,

    /// Maximum file size in bytes (default: 50MB)
    #[arg(long, env = "OCR_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// Directory uploads are stored in
    #[arg(long, env = "OCR_UPLOADS_DIR", default_value = "uploads")]
    pub uploads_dir: PathBuf,

    /// Directory per-request artifacts are written to
    #[arg(long, env = "OCR_PROCESSED_DIR", default_value = "processed")]
    pub processed_dir: PathBuf,

    /// OCR engine to use ("tesseract-cli" or "leptess")
    #[arg(long, env = "OCR_ENGINE", default_value = "tesseract-cli")]
    pub engine: String,

    /// Tesseract executable used by the tesseract-cli engine
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    pub tesseract_cmd: PathBuf,

    /// Seconds a single recognition call may take (0 disables the limit)
    #[arg(long, env = "OCR_TIMEOUT_SECS", default_value = "60")]
    pub ocr_timeout_secs: u64,

    /// Seconds before a request's artifact directory is swept (0 keeps them forever)
    #[arg(long, env = "OCR_ARTIFACT_TTL_SECS", default_value = "3600")]
    pub artifact_ttl_secs: u64,

    /// Keep intermediate artifacts in memory instead of writing them to disk
    #[arg(long, env = "OCR_NO_PERSIST_ARTIFACTS")]
    pub no_persist_artifacts: bool,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

fn parse_scale(s: &str) -> Result<f64, String> {
    let scale: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(format!("scale must be finite and greater than zero, got {}", s));
    }
    Ok(scale)
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub language: String,
    pub scale: f64,
    pub max_pixels: u64,
    pub max_file_size: usize,
    pub uploads_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub engine: String,
    pub tesseract_cmd: PathBuf,
    pub ocr_timeout: Option<Duration>,
    pub artifact_ttl: Option<Duration>,
    pub persist_artifacts: bool,
    pub tessdata_path: Option<String>,
}

impl Config {
    /// Create the uploads and processed directories if they are missing
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.uploads_dir)?;
        std::fs::create_dir_all(&self.processed_dir)?;
        Ok(())
    }

    /// Fixed recognition options: full page, configured language
    pub fn recognition_options(&self) -> RecognitionOptions {
        RecognitionOptions {
            mode: PageSegMode::FullPage,
            language: self.language.clone(),
            timeout: self.ocr_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9292,
            language: "eng".to_string(),
            scale: 2.0,
            max_pixels: DEFAULT_MAX_PIXELS,
            max_file_size: 52_428_800,
            uploads_dir: PathBuf::from("uploads"),
            processed_dir: PathBuf::from("processed"),
            engine: "tesseract-cli".to_string(),
            tesseract_cmd: PathBuf::from("tesseract"),
            ocr_timeout: Some(Duration::from_secs(60)),
            artifact_ttl: Some(Duration::from_secs(3600)),
            persist_artifacts: true,
            tessdata_path: None,
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            language: args.language,
            scale: args.scale,
            max_pixels: args.max_pixels,
            max_file_size: args.max_file_size,
            uploads_dir: args.uploads_dir,
            processed_dir: args.processed_dir,
            engine: args.engine,
            tesseract_cmd: args.tesseract_cmd,
            ocr_timeout: (args.ocr_timeout_secs > 0)
                .then(|| Duration::from_secs(args.ocr_timeout_secs)),
            artifact_ttl: (args.artifact_ttl_secs > 0)
                .then(|| Duration::from_secs(args.artifact_ttl_secs)),
            persist_artifacts: !args.no_persist_artifacts,
            tessdata_path: args.tessdata_path,
        }
    }
}
