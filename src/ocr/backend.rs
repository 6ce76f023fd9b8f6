//! OCR backend abstraction.
//!
//! Supports multiple OCR backends:
//! - Tesseract: Traditional OCR via command-line (CPU)
//! - PaddleOCR: CNN-based OCR via ONNX Runtime (feature: ocr-paddle)
//! - Command: any external program that prints PaddleOCR-style JSON

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::command::CommandBackend;
use super::result::RecognitionResult;
use super::tesseract::TesseractBackend;

/// Errors from OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Invalid OCR output: {0}")]
    InvalidOutput(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Available OCR backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendType {
    /// Tesseract OCR via command-line.
    Tesseract,
    /// PaddleOCR via ONNX Runtime.
    #[serde(rename = "paddleocr", alias = "paddle")]
    PaddleOcr,
    /// External command emitting recognition JSON.
    Command,
}

impl OcrBackendType {
    pub const ALL: [OcrBackendType; 3] = [
        OcrBackendType::Tesseract,
        OcrBackendType::PaddleOcr,
        OcrBackendType::Command,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::Tesseract => "tesseract",
            OcrBackendType::PaddleOcr => "paddleocr",
            OcrBackendType::Command => "command",
        }
    }
}

impl FromStr for OcrBackendType {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tesseract" => Ok(OcrBackendType::Tesseract),
            "paddleocr" | "paddle" => Ok(OcrBackendType::PaddleOcr),
            "command" | "cmd" => Ok(OcrBackendType::Command),
            other => Err(OcrError::BackendNotAvailable(format!(
                "unknown backend '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for OCR backends.
///
/// Implementations are constructed once at startup and shared read-only
/// across concurrent requests.
pub trait OcrBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> OcrBackendType;

    /// Check if this backend is available (dependencies installed, models present).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Run recognition on an image file.
    ///
    /// The returned shape is not interpreted here; see [`super::Normalizer`].
    fn recognize(&self, image_path: &Path) -> Result<RecognitionResult, OcrError>;
}

/// Configuration for OCR backends (language, orientation, model paths).
///
/// Fixed at startup; backends copy what they need on construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Recognition language (e.g., "en", "ch").
    pub language: String,
    /// Whether to run text orientation (angle) classification.
    pub detect_orientation: bool,
    /// Path to model files (for backends that need them).
    pub model_path: Option<PathBuf>,
    /// Inference threads for in-process backends.
    pub num_threads: usize,
    /// Program for the command backend.
    pub command: Option<String>,
    /// Arguments for the command backend ({file}, {lang} and {angle} are substituted).
    pub args: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            detect_orientation: true,
            model_path: None,
            num_threads: 4,
            command: None,
            args: vec!["{file}".to_string()],
        }
    }
}

/// Construct the backend selected at startup.
pub fn build_backend(
    config: &OcrConfig,
    backend_type: OcrBackendType,
) -> Result<Arc<dyn OcrBackend>, OcrError> {
    let backend: Arc<dyn OcrBackend> = match backend_type {
        OcrBackendType::Tesseract => Arc::new(TesseractBackend::with_config(config.clone())),
        OcrBackendType::Command => Arc::new(CommandBackend::from_config(config)?),
        #[cfg(feature = "ocr-paddle")]
        OcrBackendType::PaddleOcr => {
            Arc::new(super::paddle_backend::PaddleBackend::load(config.clone())?)
        }
        #[cfg(not(feature = "ocr-paddle"))]
        OcrBackendType::PaddleOcr => {
            return Err(OcrError::BackendNotAvailable(
                "PaddleOCR support not compiled in (rebuild with --features ocr-paddle)"
                    .to_string(),
            ))
        }
    };

    if !backend.is_available() {
        return Err(OcrError::BackendNotAvailable(backend.availability_hint()));
    }

    Ok(backend)
}
