//! External command OCR backend.
//!
//! Runs a configured program once per image and decodes its stdout as
//! PaddleOCR JSON (either result layout). Typical setup is a small bridge
//! script around the Python `paddleocr` package:
//!
//! ```toml
//! backend = "command"
//!
//! [ocr]
//! command = "python3"
//! args = ["paddle_bridge.py", "--lang", "{lang}", "--angle", "{angle}", "{file}"]
//! ```

use std::path::Path;
use std::process::Command;

use super::backend::{OcrBackend, OcrBackendType, OcrConfig, OcrError};
use super::model_utils::check_binary;
use super::result::RecognitionResult;

/// Backend that shells out to an external recognizer.
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    language: String,
    detect_orientation: bool,
}

impl CommandBackend {
    /// Create a command backend from the OCR configuration.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        let program = config
            .command
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                OcrError::BackendNotAvailable(
                    "command backend selected but no `ocr.command` configured".to_string(),
                )
            })?;

        Ok(Self {
            program,
            args: config.args.clone(),
            language: config.language.clone(),
            detect_orientation: config.detect_orientation,
        })
    }

    /// Arguments with placeholders substituted for one image.
    fn expand_args(&self, image_path: &Path) -> Vec<String> {
        let file = image_path.to_string_lossy();
        let angle = if self.detect_orientation { "true" } else { "false" };
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{file}", &file)
                    .replace("{lang}", &self.language)
                    .replace("{angle}", angle)
            })
            .collect()
    }

    fn run_command(&self, image_path: &Path) -> Result<Vec<u8>, OcrError> {
        let output = Command::new(&self.program)
            .args(self.expand_args(image_path))
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(output.stdout)
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!(
                        "{} failed: {}",
                        self.program,
                        stderr.trim()
                    )))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                OcrError::BackendNotAvailable(format!("{} not found", self.program)),
            ),
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

impl OcrBackend for CommandBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Command
    }

    fn is_available(&self) -> bool {
        check_binary(&self.program)
    }

    fn availability_hint(&self) -> String {
        if self.is_available() {
            format!("OCR command '{}' is available", self.program)
        } else {
            format!("OCR command '{}' not found in PATH", self.program)
        }
    }

    fn recognize(&self, image_path: &Path) -> Result<RecognitionResult, OcrError> {
        let stdout = self.run_command(image_path)?;
        RecognitionResult::from_slice(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(command: &str, args: &[&str]) -> CommandBackend {
        CommandBackend::from_config(&OcrConfig {
            command: Some(command.to_string()),
            args: args.iter().map(|s| s.to_string()).collect(),
            ..OcrConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_placeholders_are_substituted() {
        let backend = backend("ocr", &["--lang={lang}", "--cls", "{angle}", "{file}"]);
        assert_eq!(
            backend.expand_args(Path::new("/tmp/scan-1.png")),
            vec!["--lang=en", "--cls", "true", "/tmp/scan-1.png"]
        );
    }

    #[test]
    fn test_blank_command_rejected() {
        let config = OcrConfig {
            command: Some("  ".to_string()),
            ..OcrConfig::default()
        };
        assert!(CommandBackend::from_config(&config).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_decodes_command_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        std::fs::write(
            &path,
            r#"[{"rec_texts": ["TOTAL", "42.00"], "rec_scores": [0.95]}]"#,
        )
        .unwrap();

        let result = backend("cat", &["{file}"]).recognize(&path).unwrap();
        match result {
            RecognitionResult::Structured(page) => {
                assert_eq!(page.recognized_texts, vec!["TOTAL", "42.00"]);
                assert_eq!(page.confidence_scores.len(), 1);
            }
            other => panic!("expected structured result, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");

        let err = backend("cat", &["{file}"]).recognize(&missing).unwrap_err();
        match err {
            OcrError::OcrFailed(msg) => assert!(msg.starts_with("cat failed")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_program() {
        let backend = backend("definitely-not-an-ocr-binary-9f2c", &["{file}"]);
        assert!(!backend.is_available());
        let err = backend.recognize(Path::new("x.png")).unwrap_err();
        assert!(matches!(err, OcrError::BackendNotAvailable(_)));
    }
}
