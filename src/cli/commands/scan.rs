//! One-shot recognition of a local image.

use std::path::Path;

use console::style;

use crate::config::Settings;
use crate::ocr::{build_backend, Normalizer};
use crate::server::ScanResponse;
use crate::services::ScanService;

/// Recognize one image with the configured backend and print its text.
pub async fn cmd_scan(settings: &Settings, file: &Path, json: bool) -> anyhow::Result<()> {
    if !file.is_file() {
        anyhow::bail!("File not found: {}", file.display());
    }

    let ocr_config = settings.backend_config();
    let backend_type = settings.backend;
    let backend =
        tokio::task::spawn_blocking(move || build_backend(&ocr_config, backend_type)).await??;

    let service = ScanService::new(
        backend,
        Normalizer::new(settings.low_confidence_threshold),
        settings.temp_dir.clone(),
    );
    let output = service.scan_file(file).await?;

    if json {
        let body = ScanResponse { text: output.text };
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    println!("{}", output.text);
    eprintln!(
        "{} {} line(s) in {}ms via {} ({} low confidence)",
        style("✓").green(),
        output.lines.len(),
        output.processing_time_ms,
        settings.backend,
        output.low_confidence
    );
    Ok(())
}
