//! Configuration management for the OCR service using the prefer crate.
//!
//! Precedence, lowest to highest: built-in defaults, config file
//! (`ocr-service.{toml,yaml,json}` discovered by prefer, or `--config`),
//! environment variables, command-line flags.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ocr::{OcrBackendType, OcrConfig, DEFAULT_LOW_CONFIDENCE_THRESHOLD};

/// Name used for config file discovery.
pub const CONFIG_NAME: &str = "ocr-service";

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Application settings, fixed once the service starts.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address to listen on: PORT, HOST, or HOST:PORT.
    pub bind: String,
    /// Which OCR backend to build at startup.
    pub backend: OcrBackendType,
    /// Backend configuration (language, orientation detection, models).
    pub ocr: OcrConfig,
    /// Directory for per-request temporary uploads.
    pub temp_dir: PathBuf,
    /// Persistent data directory (downloaded models).
    pub data_dir: PathBuf,
    /// Lines scoring below this are logged as low confidence.
    pub low_confidence_threshold: f32,
    /// Optional request body cap in bytes (unlimited when `None`).
    pub max_upload_bytes: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            backend: OcrBackendType::Tesseract,
            ocr: OcrConfig::default(),
            temp_dir: env::temp_dir(),
            data_dir: default_data_dir(),
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
            max_upload_bytes: None,
        }
    }
}

impl Settings {
    /// Backend configuration as handed to `build_backend`.
    ///
    /// Backends that download their own models get a model directory under
    /// `data_dir` unless one was configured.
    pub fn backend_config(&self) -> OcrConfig {
        let mut ocr = self.ocr.clone();
        if self.backend == OcrBackendType::PaddleOcr && ocr.model_path.is_none() {
            ocr.model_path = Some(self.data_dir.join("models"));
        }
        ocr
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(self) -> anyhow::Result<Self> {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides from a variable lookup (empty values are ignored).
    pub fn with_overrides_from<F>(mut self, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        // OCR_SERVICE_BIND - listen address
        if let Some(bind) = var("OCR_SERVICE_BIND") {
            self.bind = bind;
        }

        // OCR_BACKEND - tesseract, paddleocr, command
        if let Some(backend) = var("OCR_BACKEND") {
            self.backend = backend.parse()?;
        }

        // OCR_LANG - recognition language
        if let Some(lang) = var("OCR_LANG") {
            self.ocr.language = lang;
        }

        // OCR_MODEL_PATH - model directory for in-process backends
        if let Some(path) = var("OCR_MODEL_PATH") {
            self.ocr.model_path = Some(expand_path(&path));
        }

        // OCR_COMMAND - program for the command backend
        if let Some(command) = var("OCR_COMMAND") {
            self.ocr.command = Some(command);
        }

        // OCR_TEMP_DIR - where uploads are materialized
        if let Some(dir) = var("OCR_TEMP_DIR") {
            self.temp_dir = expand_path(&dir);
        }

        // OCR_DATA_DIR - persistent data (models)
        if let Some(dir) = var("OCR_DATA_DIR") {
            self.data_dir = expand_path(&dir);
        }

        Ok(self)
    }

    /// Make sure the temporary upload directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.temp_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create temp directory '{}': {}",
                    self.temp_dir.display(),
                    e
                ),
            )
        })
    }
}

/// OCR section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect_orientation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listen address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// OCR backend name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    /// Temporary upload directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<String>,
    /// Persistent data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Low-confidence logging threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_confidence_threshold: Option<f32>,
    /// Request body cap in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<usize>,
    /// OCR backend settings.
    #[serde(default)]
    pub ocr: OcrSection,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when no config file is found.
    pub async fn load() -> anyhow::Result<Self> {
        match prefer::load(CONFIG_NAME).await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => Self::load_from_path(path).await,
                None => Ok(Self::default()),
            },
            Err(e) => {
                tracing::debug!("No {} config file found: {}", CONFIG_NAME, e);
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e)
        })?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse config contents, choosing the format from the path's extension.
    pub fn parse(contents: &str, path: &Path) -> anyhow::Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let config = match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(contents)
                .map_err(|e| anyhow::anyhow!("Failed to parse JSON config: {}", e))?,
        };
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let path = expand_path(path_str);
        if path.is_absolute() {
            path
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) -> anyhow::Result<()> {
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        if let Some(ref backend) = self.backend {
            settings.backend = backend.parse()?;
        }
        if let Some(ref dir) = self.temp_dir {
            settings.temp_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(ref dir) = self.data_dir {
            settings.data_dir = self.resolve_path(dir, base_dir);
        }
        if let Some(threshold) = self.low_confidence_threshold {
            settings.low_confidence_threshold = threshold;
        }
        if let Some(limit) = self.max_upload_bytes {
            settings.max_upload_bytes = Some(limit);
        }

        let ocr = &mut settings.ocr;
        if let Some(ref language) = self.ocr.language {
            ocr.language = language.clone();
        }
        if let Some(detect) = self.ocr.detect_orientation {
            ocr.detect_orientation = detect;
        }
        if let Some(ref path) = self.ocr.model_path {
            ocr.model_path = Some(self.resolve_path(path, base_dir));
        }
        if let Some(threads) = self.ocr.num_threads {
            ocr.num_threads = threads;
        }
        if let Some(ref command) = self.ocr.command {
            ocr.command = Some(command.clone());
        }
        if let Some(ref args) = self.ocr.args {
            ocr.args = args.clone();
        }
        Ok(())
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
}

/// Load settings from config file and environment.
pub async fn load_settings(options: &LoadOptions) -> anyhow::Result<Settings> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await?,
    };

    let cwd = || env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base_dir = if options.use_cwd {
        cwd()
    } else {
        config.base_dir().unwrap_or_else(cwd)
    };

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir)?;

    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    settings.with_env_overrides()
}

/// Default data directory (~/.local/share/ocr-service on Linux).
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_NAME)
}

/// Expand a leading `~` in a path.
fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Parse a bind address that can be:
/// - Just a port: "8000" -> 127.0.0.1:8000
/// - Just a host: "0.0.0.0" -> 0.0.0.0:8000
/// - Host and port: "0.0.0.0:8000" -> 0.0.0.0:8000
pub fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            if host.is_empty() {
                anyhow::bail!("Invalid bind address '{}': missing host", bind);
            }
            return Ok((host.to_string(), port));
        }
    }

    if bind.is_empty() {
        anyhow::bail!("Empty bind address");
    }
    Ok((bind.to_string(), 8000))
}
