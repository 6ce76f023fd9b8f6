//! Raw recognition output.
//!
//! PaddleOCR has shipped two incompatible result layouts for the same call:
//! the current pipeline returns one mapping per page
//! (`{"rec_texts": [...], "rec_scores": [...], ...}`), while older releases
//! return a list of `[[box], [text, score]]` line entries. Both are decoded
//! here, once, into [`RecognitionResult`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::backend::OcrError;

/// Quadrilateral (or polygon) around a recognized line, as `[x, y]` points.
pub type BoundingBox = Vec<[f32; 2]>;

/// Output of a single recognition call.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionResult {
    /// Parallel text/score lists.
    Structured(StructuredResult),
    /// One entry per line, each with its own box and score.
    Legacy(Vec<LegacyLine>),
    /// Nothing recognized.
    Empty,
    /// A page that is neither a mapping nor a list.
    Unrecognized(Value),
}

/// Mapping-style page result.
///
/// The lists are not guaranteed to be the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredResult {
    #[serde(default, alias = "rec_texts")]
    pub recognized_texts: Vec<String>,
    #[serde(default, alias = "rec_scores")]
    pub confidence_scores: Vec<f32>,
}

/// Line entry of the list-style page result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawLegacyLine", into = "RawLegacyLine")]
pub struct LegacyLine {
    pub bbox: BoundingBox,
    pub text: String,
    pub score: f32,
}

impl LegacyLine {
    pub fn new(bbox: BoundingBox, text: impl Into<String>, score: f32) -> Self {
        Self {
            bbox,
            text: text.into(),
            score,
        }
    }
}

/// Positional wire form: `[[[x, y], ...], [text, score]]`.
#[derive(Serialize, Deserialize)]
struct RawLegacyLine(BoundingBox, (String, f32));

impl From<RawLegacyLine> for LegacyLine {
    fn from(RawLegacyLine(bbox, (text, score)): RawLegacyLine) -> Self {
        Self { bbox, text, score }
    }
}

impl From<LegacyLine> for RawLegacyLine {
    fn from(line: LegacyLine) -> Self {
        RawLegacyLine(line.bbox, (line.text, line.score))
    }
}

impl RecognitionResult {
    /// Decode recognizer JSON output.
    ///
    /// A top-level list holds one page per input image; only the first page
    /// is used since exactly one image is submitted per call.
    pub fn from_json(value: Value) -> Result<Self, OcrError> {
        let page = match value {
            Value::Array(mut pages) => {
                if pages.is_empty() {
                    return Ok(RecognitionResult::Empty);
                }
                pages.swap_remove(0)
            }
            other => other,
        };

        match page {
            Value::Null => Ok(RecognitionResult::Empty),
            Value::Array(ref lines) if lines.is_empty() => Ok(RecognitionResult::Empty),
            Value::Object(_) => serde_json::from_value(page)
                .map(RecognitionResult::Structured)
                .map_err(|e| OcrError::InvalidOutput(format!("structured result: {}", e))),
            Value::Array(_) => serde_json::from_value(page)
                .map(RecognitionResult::Legacy)
                .map_err(|e| OcrError::InvalidOutput(format!("line result: {}", e))),
            other => Ok(RecognitionResult::Unrecognized(other)),
        }
    }

    /// Decode recognizer output from raw bytes (e.g. a subprocess's stdout).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, OcrError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RecognitionResult::Empty);
        }
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| OcrError::InvalidOutput(format!("not JSON: {}", e)))?;
        Self::from_json(value)
    }

    /// Short label for log lines.
    pub fn shape(&self) -> &'static str {
        match self {
            RecognitionResult::Structured(_) => "structured",
            RecognitionResult::Legacy(_) => "legacy",
            RecognitionResult::Empty => "empty",
            RecognitionResult::Unrecognized(_) => "unrecognized",
        }
    }
}
