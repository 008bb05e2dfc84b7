//! Leptess/Tesseract engine implementation
//!
//! In-process Tesseract via the tesseract-static crate (static linking, no
//! system dependencies). Downloads tessdata on first use. Runs inside the
//! calling thread, so the recognition timeout does not apply here.

use crate::config::Config;
use crate::engine::{EngineError, RecognitionOptions, TextRecognizer};
use image::GrayImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tesseract_static::tesseract::Tesseract;

/// Tesseract OCR Engine
pub struct LeptessEngine {
    /// Path to tessdata directory
    tessdata_path: String,
}

impl LeptessEngine {
    /// Create a new Tesseract-based OCR engine
    pub fn new(config: &Config) -> Result<Self, EngineError> {
        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(&config.language)?,
        };

        // Validate that tessdata is accessible by doing a test initialization
        let test_tess = Tesseract::new(Some(&tessdata_path), Some(&config.language))
            .map_err(|e| EngineError::NotFound(format!("Failed to initialize Tesseract: {}", e)))?;
        drop(test_tess);

        tracing::info!(
            "Leptess engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            config.language
        );

        Ok(Self { tessdata_path })
    }
}

impl TextRecognizer for LeptessEngine {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR linked in-process"
    }

    fn recognize(
        &self,
        image: &GrayImage,
        options: &RecognitionOptions,
    ) -> Result<String, EngineError> {
        let (width, height) = image.dimensions();

        // BMP is always supported by leptonica
        let mut bmp_data = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bmp_data), image::ImageFormat::Bmp)
            .map_err(|e| EngineError::Failed(format!("Failed to convert to BMP: {}", e)))?;

        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(&options.language))
            .map_err(|e| EngineError::NotFound(format!("Failed to create Tesseract: {}", e)))?
            .set_variable("tessedit_pageseg_mode", &options.mode.psm().to_string())
            .map_err(|e| EngineError::Failed(format!("Failed to set page mode: {}", e)))?
            .set_image_from_mem(&bmp_data)
            .map_err(|e| {
                EngineError::Failed(format!(
                    "Failed to set image ({}x{}, {} bytes): {}",
                    width,
                    height,
                    bmp_data.len(),
                    e
                ))
            })?
            .recognize()
            .map_err(|e| EngineError::Failed(format!("Failed to recognize text: {}", e)))?;

        tess.get_text()
            .map_err(|e| EngineError::Failed(format!("Failed to get text: {}", e)))
    }
}

/// Ensure tessdata is available, downloading if needed
fn ensure_tessdata_available(language: &str) -> Result<String, EngineError> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("photo-ocr")
        .join("tessdata");

    std::fs::create_dir_all(&cache_dir)?;

    let traineddata_path = cache_dir.join(format!("{}.traineddata", language));

    if !traineddata_path.exists() {
        tracing::info!(
            "Downloading tessdata for '{}' (this may take a moment)...",
            language
        );
        download_file(&tessdata_url(language), &traineddata_path)?;
        tracing::info!("Downloaded tessdata to {:?}", traineddata_path);
    } else {
        tracing::info!("Using cached tessdata from {:?}", cache_dir);
    }

    // Tesseract expects the directory, not the file
    cache_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| EngineError::NotFound("Invalid tessdata path".to_string()))
}

fn tessdata_url(language: &str) -> String {
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

fn download_file(url: &str, path: &Path) -> Result<(), EngineError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| EngineError::NotFound(format!("Failed to download tessdata: {}", e)))?;

    let buffer = response
        .into_body()
        .read_to_vec()
        .map_err(|e| EngineError::NotFound(format!("Failed to read tessdata response: {}", e)))?;

    let mut file = File::create(path)?;
    file.write_all(&buffer)?;

    Ok(())
}
