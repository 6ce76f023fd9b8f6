//! Types for the scan service.

use thiserror::Error;

use crate::ocr::{OcrError, RecognizedLine};
use crate::storage::UploadError;

/// Outcome of one successful scan.
#[derive(Debug, Clone)]
pub struct ScanOutput {
    /// Recognized lines joined with `\n`.
    pub text: String,
    /// Lines in recognition order, with scores.
    pub lines: Vec<RecognizedLine>,
    /// How many lines scored under the low-confidence threshold.
    pub low_confidence: usize,
    /// Shape of the raw recognizer output.
    pub shape: &'static str,
    /// Recognition plus normalization time in milliseconds.
    pub processing_time_ms: u64,
}

/// Errors from a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The upload body could not be read from the client.
    #[error("{0}")]
    Upload(String),

    /// The upload could not be written to or read from temporary storage.
    #[error("storage error: {0}")]
    Storage(#[source] std::io::Error),

    /// The recognizer rejected the file or failed internally.
    #[error(transparent)]
    Recognition(#[from] OcrError),

    /// The blocking recognition task panicked or was cancelled.
    #[error("recognition worker failed: {0}")]
    Worker(String),
}

impl From<UploadError> for ScanError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Read(source) => ScanError::Upload(source.to_string()),
            UploadError::Io(e) => ScanError::Storage(e),
        }
    }
}
