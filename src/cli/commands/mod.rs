//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod ocr_check;
mod scan;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};
use crate::ocr::OcrBackendType;

#[derive(Parser)]
#[command(name = "ocr-service")]
#[command(about = "HTTP service that extracts text from uploaded images")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "OCR_SERVICE_CONFIG")]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// OCR backend to use (tesseract, paddleocr, command)
    #[arg(short, long, global = true)]
    backend: Option<OcrBackendType>,

    /// Recognition language (e.g. en, ch)
    #[arg(short, long, global = true)]
    lang: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the OCR web server
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (default: 127.0.0.1:8000)
        bind: Option<String>,
    },

    /// Recognize a single image and print its text
    Scan {
        /// Image file to recognize
        file: PathBuf,

        /// Print the same JSON body the /scan endpoint returns
        #[arg(long)]
        json: bool,
    },

    /// Check which OCR backends are available
    OcrCheck,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };
    let mut settings = load_settings(&options).await?;

    // Command-line flags win over config and environment
    if let Some(backend) = cli.backend {
        settings.backend = backend;
    }
    if let Some(lang) = cli.lang {
        settings.ocr.language = lang;
    }

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            serve::cmd_serve(&settings, &bind).await
        }
        Commands::Scan { file, json } => scan::cmd_scan(&settings, &file, json).await,
        Commands::OcrCheck => ocr_check::cmd_ocr_check(&settings).await,
    }
}
