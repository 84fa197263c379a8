//! OCR: turn a page image into text with a fixed engine configuration.
//!
//! The production engine shells out to the `tesseract` CLI, the same way it
//! would be driven by hand: write the page to a temp PNG, run
//! `tesseract page.png stdout --oem 3 --psm 6 [-l lang]`, read stdout.
//! `--psm 6` ("assume a single uniform block of text") suits scanned pages
//! and screenshots better than full auto-segmentation, which tends to split
//! body text into spurious columns.

use crate::pipeline::encode::encode_png;
use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Environment variable overriding the tesseract executable.
pub const TESSERACT_CMD_ENV: &str = "TESSERACT_CMD";

/// Engine configuration passed on every OCR call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrSettings {
    /// OCR engine mode (`--oem`). 3 = default, whatever is available.
    pub engine_mode: u8,
    /// Page segmentation mode (`--psm`). 6 = single uniform block of text.
    pub page_segmentation_mode: u8,
    /// Recognition language/model (`-l`), e.g. `eng` or `eng+best`.
    pub language: Option<String>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            engine_mode: 3,
            page_segmentation_mode: 6,
            language: None,
        }
    }
}

impl OcrSettings {
    /// Command-line arguments for this configuration.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--oem".to_string(),
            self.engine_mode.to_string(),
            "--psm".to_string(),
            self.page_segmentation_mode.to_string(),
        ];
        if let Some(lang) = &self.language {
            args.push("-l".to_string());
            args.push(lang.clone());
        }
        args
    }
}

impl fmt::Display for OcrSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args().join(" "))
    }
}

/// Failure inside an OCR engine. The pipeline attaches the page number.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine could not be started at all.
    #[error("cannot start '{command}': {detail}")]
    Unavailable { command: String, detail: String },

    /// The engine started but did not produce text.
    #[error("{0}")]
    Failed(String),
}

/// Recognises text in a single page image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &DynamicImage, settings: &OcrSettings)
        -> Result<String, OcrError>;
}

/// [`OcrEngine`] wrapping the `tesseract` CLI tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    command: String,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractEngine {
    /// Use `$TESSERACT_CMD`, falling back to `tesseract` on `PATH`.
    pub fn new() -> Self {
        let command = std::env::var(TESSERACT_CMD_ENV)
            .ok()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "tesseract".to_string());
        Self { command }
    }

    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    #[instrument(level = "debug", skip_all, fields(config = %settings))]
    async fn recognize(
        &self,
        image: &DynamicImage,
        settings: &OcrSettings,
    ) -> Result<String, OcrError> {
        let png = encode_png(image)
            .map_err(|e| OcrError::Failed(format!("cannot encode page as PNG: {e}")))?;

        let tmpdir = tempfile::TempDir::with_prefix("scan2docx-ocr")
            .map_err(|e| OcrError::Failed(format!("cannot create temp dir: {e}")))?;
        let input_path = tmpdir.path().join("page.png");
        tokio::fs::write(&input_path, &png)
            .await
            .map_err(|e| OcrError::Failed(format!("cannot write OCR input: {e}")))?;

        let output = Command::new(&self.command)
            .arg(&input_path)
            .arg("stdout")
            .args(settings.args())
            .output()
            .await
            .map_err(|e| OcrError::Unavailable {
                command: self.command.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract produced {} chars", text.len());
        Ok(text)
    }
}
