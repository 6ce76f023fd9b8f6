//! Shared utilities for OCR backends.
//!
//! Provides common functionality for:
//! - Checking for CLI tool availability
//! - Downloading and locating OCR models

use std::path::{Path, PathBuf};

/// Check if a binary is available in PATH (or is a direct path that exists).
pub fn check_binary(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Model file specification for downloading.
#[cfg(feature = "ocr-paddle")]
pub struct ModelSpec {
    /// URL to download from.
    pub url: &'static str,
    /// Filename to save as.
    pub filename: &'static str,
    /// Human-readable size for progress messages.
    pub size_hint: &'static str,
}

/// Configuration for model directory management.
#[cfg_attr(not(feature = "ocr-paddle"), allow(dead_code))]
pub struct ModelDirConfig {
    /// Subdirectory name under data_dir (e.g., "paddle-ocr").
    pub subdir: &'static str,
    /// Required model files to check for presence.
    pub required_files: &'static [&'static str],
}

#[cfg_attr(not(feature = "ocr-paddle"), allow(dead_code))]
impl ModelDirConfig {
    /// Get the default model directory for this backend.
    pub fn default_dir(&self) -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join(self.subdir)
            .join("models")
    }

    /// Get standard candidate directories to search for models.
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        [
            dirs::data_dir().map(|d| d.join(self.subdir).join("models")),
            dirs::home_dir().map(|d| d.join(format!(".{}", self.subdir)).join("models")),
            Some(PathBuf::from(format!("/usr/share/{}/models", self.subdir))),
            Some(PathBuf::from(format!(
                "./models/{}",
                self.subdir.split('-').next().unwrap_or(self.subdir)
            ))),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Check if a directory contains all required model files.
    pub fn has_required_files(&self, dir: &Path) -> bool {
        self.required_files
            .iter()
            .all(|file| dir.join(file).exists())
    }

    /// First directory holding every required file, preferring `explicit`.
    pub fn find(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .into_iter()
            .chain(self.candidate_dirs())
            .find(|dir| self.has_required_files(dir))
    }
}

/// Download a file from a URL to a local path using curl or wget.
#[cfg(feature = "ocr-paddle")]
pub fn download_file(url: &str, dest: &Path) -> Result<(), super::OcrError> {
    use super::OcrError;
    use std::process::Command;

    let output = Command::new("curl")
        .args(["-fSL", "--progress-bar", "-o"])
        .arg(dest)
        .arg(url)
        .status();

    match output {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => {
            let _ = std::fs::remove_file(dest);
            Err(OcrError::OcrFailed(format!("Failed to download {}", url)))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // Try wget as fallback
            let output = Command::new("wget")
                .args(["-q", "--show-progress", "-O"])
                .arg(dest)
                .arg(url)
                .status();

            match output {
                Ok(status) if status.success() => Ok(()),
                Ok(_) => {
                    let _ = std::fs::remove_file(dest);
                    Err(OcrError::OcrFailed(format!("Failed to download {}", url)))
                }
                Err(_) => Err(OcrError::BackendNotAvailable(
                    "Neither curl nor wget found. Install one to download models.".to_string(),
                )),
            }
        }
        Err(e) => Err(OcrError::Io(e)),
    }
}

/// Download a model file if it doesn't exist.
#[cfg(feature = "ocr-paddle")]
pub fn ensure_model_file(spec: &ModelSpec, model_dir: &Path) -> Result<(), super::OcrError> {
    let dest = model_dir.join(spec.filename);
    if !dest.exists() {
        tracing::info!("Downloading {} (~{})...", spec.filename, spec.size_hint);
        download_file(spec.url, &dest)?;
        tracing::info!("Downloaded {}", spec.filename);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: ModelDirConfig = ModelDirConfig {
        subdir: "test-ocr",
        required_files: &["det.onnx", "rec.onnx"],
    };

    #[test]
    fn test_has_required_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!CONFIG.has_required_files(dir.path()));

        std::fs::write(dir.path().join("det.onnx"), b"").unwrap();
        assert!(!CONFIG.has_required_files(dir.path()));

        std::fs::write(dir.path().join("rec.onnx"), b"").unwrap();
        assert!(CONFIG.has_required_files(dir.path()));
        assert_eq!(CONFIG.find(Some(dir.path())), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_candidate_dirs_use_subdir() {
        let dirs = CONFIG.candidate_dirs();
        assert!(dirs.contains(&PathBuf::from("/usr/share/test-ocr/models")));
        assert!(dirs.contains(&PathBuf::from("./models/test")));
        assert!(CONFIG.default_dir().ends_with("test-ocr/models"));
    }

    #[test]
    fn test_check_binary_missing() {
        assert!(!check_binary("definitely-not-an-ocr-binary-9f2c"));
    }
}
