//! Tesseract OCR backend implementation.
//!
//! Uses Tesseract OCR via command-line with TSV output so each line
//! carries a bounding box and a confidence score.

use std::path::Path;
use std::process::Command;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError};
use super::model_utils::check_binary;
use super::result::{LegacyLine, RecognitionResult};

/// Tesseract OCR backend.
pub struct TesseractBackend {
    config: OcrConfig,
}

impl TesseractBackend {
    /// Create a new Tesseract backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: OcrConfig::default(),
        }
    }

    /// Create a new Tesseract backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Tesseract traineddata name for the configured language.
    fn language(&self) -> &str {
        match self.config.language.as_str() {
            "en" => "eng",
            "ch" => "chi_sim",
            "chinese_cht" => "chi_tra",
            "fr" => "fra",
            "german" | "de" => "deu",
            "japan" | "ja" => "jpn",
            "korean" | "ko" => "kor",
            other => other,
        }
    }

    /// Run Tesseract on an image file, returning its TSV report.
    fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let mut command = Command::new("tesseract");
        command
            .arg(image_path)
            .arg("stdout")
            .args(["-l", self.language()]);
        if let Some(ref dir) = self.config.model_path {
            command.arg("--tessdata-dir").arg(dir);
        }
        let output = command.arg("tsv").output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr.trim())))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        check_binary("tesseract")
    }

    fn availability_hint(&self) -> String {
        if !check_binary("tesseract") {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        } else {
            format!("Tesseract is available (language: {})", self.language())
        }
    }

    fn recognize(&self, image_path: &Path) -> Result<RecognitionResult, OcrError> {
        let tsv = self.run_tesseract(image_path)?;
        let lines = parse_tsv(&tsv);
        if lines.is_empty() {
            return Ok(RecognitionResult::Empty);
        }
        Ok(RecognitionResult::Legacy(lines))
    }
}

/// Word-level TSV row level.
const WORD_LEVEL: &str = "5";

/// Accumulates the words of one layout line.
struct LineAccumulator {
    key: (u32, u32, u32, u32),
    words: Vec<String>,
    conf_sum: f32,
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl LineAccumulator {
    fn finish(self) -> LegacyLine {
        let score = (self.conf_sum / self.words.len() as f32 / 100.0).clamp(0.0, 1.0);
        LegacyLine::new(
            vec![
                [self.left, self.top],
                [self.right, self.top],
                [self.right, self.bottom],
                [self.left, self.bottom],
            ],
            self.words.join(" "),
            score,
        )
    }
}

/// Group Tesseract's word rows into lines in reading order.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text.
pub(crate) fn parse_tsv(tsv: &str) -> Vec<LegacyLine> {
    let mut lines = Vec::new();
    let mut current: Option<LineAccumulator> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != WORD_LEVEL {
            continue;
        }
        let text = cols[11].trim();
        let conf: f32 = match cols[10].parse() {
            Ok(c) if c >= 0.0 => c,
            _ => continue,
        };
        if text.is_empty() {
            continue;
        }

        let num = |i: usize| cols[i].parse::<u32>().unwrap_or(0);
        let key = (num(1), num(2), num(3), num(4));
        let (left, top, width, height) = (
            num(6) as f32,
            num(7) as f32,
            num(8) as f32,
            num(9) as f32,
        );

        match current.as_mut() {
            Some(acc) if acc.key == key => {
                acc.words.push(text.to_string());
                acc.conf_sum += conf;
                acc.left = acc.left.min(left);
                acc.top = acc.top.min(top);
                acc.right = acc.right.max(left + width);
                acc.bottom = acc.bottom.max(top + height);
            }
            _ => {
                if let Some(done) = current.take() {
                    lines.push(done.finish());
                }
                current = Some(LineAccumulator {
                    key,
                    words: vec![text.to_string()],
                    conf_sum: conf,
                    left,
                    top,
                    right: left + width,
                    bottom: top + height,
                });
            }
        }
    }

    if let Some(done) = current {
        lines.push(done.finish());
    }
    lines
}
