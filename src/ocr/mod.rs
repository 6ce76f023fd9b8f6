//! OCR adapter and result normalization.
//!
//! ## OCR Backends
//!
//! - **Tesseract**: Traditional OCR, widely available, CPU-based (default)
//! - **PaddleOCR**: CNN-based, in-process via ONNX (feature: ocr-paddle)
//! - **Command**: any external recognizer that prints PaddleOCR JSON
//!
//! Exactly one backend is built at startup with [`build_backend`] and shared
//! by all requests.

mod backend;
mod command;
mod model_utils;
mod normalize;
mod result;
mod tesseract;

#[cfg(feature = "ocr-paddle")]
mod paddle_backend;

pub use backend::{build_backend, OcrBackend, OcrBackendType, OcrConfig, OcrError};
pub use command::CommandBackend;
pub use model_utils::check_binary;
pub use normalize::{Normalizer, RecognizedLine, DEFAULT_LOW_CONFIDENCE_THRESHOLD};
pub use result::{BoundingBox, LegacyLine, RecognitionResult, StructuredResult};
pub use tesseract::TesseractBackend;

#[cfg(feature = "ocr-paddle")]
pub use paddle_backend::PaddleBackend;
