//! Flattening of recognition results into plain text.

use super::result::RecognitionResult;

/// Scores below this are reported in the logs.
pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f32 = 0.8;

/// A recognized line with its confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedLine {
    pub text: String,
    pub score: f32,
}

/// Converts either result shape into ordered lines and newline-joined text.
///
/// Confidence never removes a line; it only decides whether a diagnostic is
/// logged for it.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    low_confidence_threshold: f32,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_LOW_CONFIDENCE_THRESHOLD)
    }
}

impl Normalizer {
    pub fn new(low_confidence_threshold: f32) -> Self {
        Self {
            low_confidence_threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.low_confidence_threshold
    }

    pub fn is_low_confidence(&self, line: &RecognizedLine) -> bool {
        line.score < self.low_confidence_threshold
    }

    /// Ordered (text, score) pairs. Structured texts without a score get 0.0.
    pub fn lines(&self, result: &RecognitionResult) -> Vec<RecognizedLine> {
        match result {
            RecognitionResult::Empty => Vec::new(),
            RecognitionResult::Structured(page) => page
                .recognized_texts
                .iter()
                .enumerate()
                .map(|(i, text)| RecognizedLine {
                    text: text.clone(),
                    score: page.confidence_scores.get(i).copied().unwrap_or(0.0),
                })
                .collect(),
            RecognitionResult::Legacy(entries) => entries
                .iter()
                .map(|line| RecognizedLine {
                    text: line.text.clone(),
                    score: line.score,
                })
                .collect(),
            RecognitionResult::Unrecognized(value) => {
                // Kept lenient: the caller still gets a 200 with empty text.
                tracing::warn!(
                    "Unrecognized OCR result shape, returning no text: {}",
                    value
                );
                Vec::new()
            }
        }
    }

    /// Join recognized lines with `\n`, logging low-confidence ones.
    pub fn normalize(&self, result: &RecognitionResult) -> String {
        self.join(&self.lines(result))
    }

    /// Join already extracted lines, logging low-confidence ones.
    pub fn join(&self, lines: &[RecognizedLine]) -> String {
        for line in lines.iter().filter(|l| self.is_low_confidence(l)) {
            tracing::debug!("Low confidence ({:.2}): {}", line.score, line.text);
        }
        lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
