//! Stage 4: hand the binarized artifact to the OCR engine

use crate::artifact::ProcessingArtifact;
use crate::engine::{RecognitionOptions, TextRecognizer};
use crate::error::PipelineError;
use std::time::Instant;

/// Recognize text in `input`. The engine's output is returned untouched.
pub fn recognize(
    recognizer: &dyn TextRecognizer,
    input: &ProcessingArtifact,
    options: &RecognitionOptions,
) -> Result<String, PipelineError> {
    let start = Instant::now();
    let text = match input.image.as_luma8() {
        Some(gray) => recognizer.recognize(gray, options)?,
        None => recognizer.recognize(&input.image.to_luma8(), options)?,
    };

    tracing::info!(
        "{} recognized {} chars in {}ms",
        recognizer.name(),
        text.len(),
        start.elapsed().as_millis()
    );
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Slot;
    use crate::engine::{EngineError, PageSegMode};
    use crate::error::FailureKind;
    use image::{DynamicImage, GrayImage};
    use std::sync::Mutex;

    struct Recording {
        reply: Result<&'static str, ()>,
        seen: Mutex<Vec<(u32, u32, PageSegMode, String)>>,
    }

    impl TextRecognizer for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn description(&self) -> &'static str {
            "test double"
        }

        fn recognize(
            &self,
            image: &GrayImage,
            options: &RecognitionOptions,
        ) -> Result<String, EngineError> {
            self.seen.lock().unwrap().push((
                image.width(),
                image.height(),
                options.mode,
                options.language.clone(),
            ));
            self.reply
                .map(str::to_string)
                .map_err(|_| EngineError::Failed("boom".to_string()))
        }
    }

    fn binarized() -> ProcessingArtifact {
        ProcessingArtifact {
            slot: Slot::Binarized,
            image: DynamicImage::ImageLuma8(GrayImage::new(12, 7)),
            path: None,
        }
    }

    #[test]
    fn test_text_is_returned_verbatim() {
        let engine = Recording {
            reply: Ok("  HELLO\n\nWORLD \n"),
            seen: Mutex::new(Vec::new()),
        };

        let text = recognize(&engine, &binarized(), &RecognitionOptions::default()).unwrap();

        assert_eq!(text, "  HELLO\n\nWORLD \n");
        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen[0], (12, 7, PageSegMode::FullPage, "eng".to_string()));
    }

    #[test]
    fn test_engine_error_becomes_runtime_failure() {
        let engine = Recording {
            reply: Err(()),
            seen: Mutex::new(Vec::new()),
        };

        let err = recognize(&engine, &binarized(), &RecognitionOptions::default()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::EngineRuntime);
    }
}
