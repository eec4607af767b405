use async_trait::async_trait;
use std::fmt;
use std::io::Write;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::AppError;

/// Image-to-text recognition.
#[async_trait]
pub trait OcrEngine: Send + Sync + fmt::Debug {
    async fn recognize(&self, image: &[u8]) -> Result<String, AppError>;
}

/// Runs the `tesseract` binary on a temporary copy of the image.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
    language: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            language: "eng".to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, AppError> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(image)?;
        file.flush()?;

        let run = Command::new(&self.command)
            .arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| AppError::Timeout {
                service: "OCR",
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| AppError::Upstream(format!("Failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            return Err(AppError::Upstream(format!(
                "OCR failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("OCR text:\n---\n{}\n---", text);

        if text.trim().is_empty() {
            return Err(AppError::Upstream("OCR found no text in the image".to_string()));
        }
        Ok(text)
    }
}

/// Returns the same text for every image. Used in tests and offline runs.
#[derive(Debug, Clone)]
pub struct FixedTextOcr {
    text: Option<String>,
}

impl FixedTextOcr {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// An engine that fails every recognition, like an unreadable image.
    pub fn failing() -> Self {
        Self { text: None }
    }
}

#[async_trait]
impl OcrEngine for FixedTextOcr {
    async fn recognize(&self, _image: &[u8]) -> Result<String, AppError> {
        self.text
            .clone()
            .ok_or_else(|| AppError::Upstream("OCR could not read the image".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_upstream_error() {
        let ocr = TesseractOcr::new("definitely-not-a-tesseract-binary", Duration::from_secs(5));
        let result = ocr.recognize(b"not really a png").await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_fixed_text_engine() {
        assert_eq!(FixedTextOcr::new("MILK 3.49").recognize(b"").await.unwrap(), "MILK 3.49");
        assert!(FixedTextOcr::failing().recognize(b"").await.is_err());
    }
}
