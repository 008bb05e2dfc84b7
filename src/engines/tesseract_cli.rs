//! Tesseract CLI engine implementation
//!
//! Drives the `tesseract` executable as a child process. The image is handed
//! over as a temporary PNG and the text is read back from the output file
//! Tesseract writes next to it, so neither pipe can fill up while we wait.
//!
//! `recognize` is synchronous and must run off the async worker threads
//! (the server calls it from `spawn_blocking`).

use crate::engine::{EngineError, RecognitionOptions, TextRecognizer};
use image::{GrayImage, ImageFormat};
use std::fs::File;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::runtime::{Handle, RuntimeFlavor};

/// OCR engine that shells out to the Tesseract command line tool
pub struct TesseractCli {
    command: PathBuf,
    tessdata_path: Option<String>,
}

impl TesseractCli {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            tessdata_path: None,
        }
    }

    pub fn with_tessdata(mut self, tessdata_path: Option<String>) -> Self {
        self.tessdata_path = tessdata_path;
        self
    }

    fn spawn(
        &self,
        input: &Path,
        output_base: &Path,
        stderr: File,
        options: &RecognitionOptions,
    ) -> Result<Child, EngineError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg(input)
            .arg(output_base)
            .args(["--oem", "3"])
            .arg("--psm")
            .arg(options.mode.psm().to_string())
            .arg("-l")
            .arg(&options.language)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true);

        if let Some(tessdata) = &self.tessdata_path {
            cmd.arg("--tessdata-dir").arg(tessdata);
        }

        cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                EngineError::NotFound(format!("{}: {}", self.command.display(), e))
            }
            _ => EngineError::Io(e),
        })
    }
}

impl TextRecognizer for TesseractCli {
    fn name(&self) -> &'static str {
        "tesseract-cli"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR run as an external process"
    }

    fn recognize(
        &self,
        image: &GrayImage,
        options: &RecognitionOptions,
    ) -> Result<String, EngineError> {
        let workdir = tempfile::Builder::new().prefix("photo-ocr-").tempdir()?;
        let input = workdir.path().join("input.png");
        let output_base = workdir.path().join("output");
        let stderr_path = workdir.path().join("stderr.log");

        image
            .save_with_format(&input, ImageFormat::Png)
            .map_err(|e| EngineError::Failed(format!("Failed to write engine input: {}", e)))?;

        tracing::debug!(
            "Running {} on {}x{} image (psm {}, lang {})",
            self.command.display(),
            image.width(),
            image.height(),
            options.mode.psm(),
            options.language
        );

        let stderr = File::create(&stderr_path)?;
        let status = block_on(async {
            let mut child = self.spawn(&input, &output_base, stderr, options)?;
            wait_with_timeout(&mut child, options.timeout).await
        })??;

        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(EngineError::Failed(format!(
                "{} exited with {}: {}",
                self.command.display(),
                status,
                stderr.trim()
            )));
        }

        let text = std::fs::read(output_base.with_extension("txt"))?;
        Ok(String::from_utf8_lossy(&text).into_owned())
    }
}

/// Drive `future` to completion from synchronous code: on the surrounding
/// multi-threaded runtime when there is one, otherwise on a private
/// current-thread runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output, EngineError> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            Ok(handle.block_on(future))
        }
        _ => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            Ok(runtime.block_on(future))
        }
    }
}

/// Wait for `child`, killing it once `timeout` has elapsed
async fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
) -> Result<ExitStatus, EngineError> {
    let Some(limit) = timeout else {
        return Ok(child.wait().await?);
    };

    match tokio::time::timeout(limit, child.wait()).await {
        Ok(status) => Ok(status?),
        Err(_) => {
            tracing::warn!("OCR engine exceeded {:?}, killing pid {:?}", limit, child.id());
            // The child may have exited just before the kill
            let _ = child.kill().await;
            Err(EngineError::Timeout(limit))
        }
    }
}
