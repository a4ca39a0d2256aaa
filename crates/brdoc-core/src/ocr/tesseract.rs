//! OCR backend shelling out to the `tesseract` command-line tool.

use std::process::Command;

use image::{DynamicImage, ImageFormat};
use tracing::{debug, trace};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::OcrBackend;

/// Runs `tesseract <image> stdout -l <lang> --psm 3` per page.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(&config.tesseract_binary, &config.language)
    }

    /// Whether the binary can be executed.
    pub fn probe(binary: &str) -> bool {
        Command::new(binary)
            .arg("--version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

impl OcrBackend for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        Self::probe(&self.binary)
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| OcrError::Recognition(format!("failed to create temp dir: {}", e)))?;
        let input_path = temp_dir.path().join("page.png");

        image
            .save_with_format(&input_path, ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(format!("failed to write page image: {}", e)))?;

        trace!("Running {} on {}", self.binary, input_path.display());

        let output = Command::new(&self.binary)
            .arg(&input_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg("3")
            .output()
            .map_err(|e| OcrError::Unavailable(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Recognition(format!(
                "tesseract failed: {}",
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        debug!("tesseract produced {} characters", text.chars().count());

        Ok(text)
    }
}
