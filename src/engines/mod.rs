//! OCR engine implementations
//!
//! The Tesseract CLI engine is always available. The in-process leptess
//! engine is compiled in with the `engine-leptess` feature.

#[cfg(feature = "engine-leptess")]
pub mod leptess;
pub mod tesseract_cli;

use crate::config::Config;
use crate::engine::{EngineError, TextRecognizer};
use std::sync::Arc;

pub use tesseract_cli::TesseractCli;

/// Names accepted by `--engine` in this build
pub fn available() -> Vec<&'static str> {
    let mut names = vec!["tesseract-cli"];
    if cfg!(feature = "engine-leptess") {
        names.push("leptess");
    }
    names
}

/// Build the recognizer selected in the configuration
pub fn build(config: &Config) -> Result<Arc<dyn TextRecognizer>, EngineError> {
    match config.engine.as_str() {
        "tesseract-cli" => {
            tracing::info!(
                "Using tesseract-cli engine ({})",
                config.tesseract_cmd.display()
            );
            Ok(Arc::new(
                TesseractCli::new(&config.tesseract_cmd)
                    .with_tessdata(config.tessdata_path.clone()),
            ))
        }
        #[cfg(feature = "engine-leptess")]
        "leptess" => {
            tracing::info!("Initializing leptess engine...");
            Ok(Arc::new(leptess::LeptessEngine::new(config)?))
        }
        other => Err(EngineError::NotFound(format!(
            "Unknown engine '{}'. Available: {}",
            other,
            available().join(", ")
        ))),
    }
}
