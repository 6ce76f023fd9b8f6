//! OCR backend status report.

use console::style;

use crate::config::Settings;
use crate::ocr::{CommandBackend, OcrBackend, OcrBackendType, TesseractBackend};

/// Check which OCR backends can be used with the current settings.
pub async fn cmd_ocr_check(settings: &Settings) -> anyhow::Result<()> {
    println!("\n{}", style("OCR Backend Status").bold());
    println!("{}", "-".repeat(50));

    for backend_type in OcrBackendType::ALL {
        let marker = if backend_type == settings.backend {
            style("*").cyan()
        } else {
            style(" ")
        };
        let (status, hint) = probe(settings, backend_type);
        println!("{} {:<12} {}", marker, backend_type.as_str(), status);
        if let Some(hint) = hint {
            println!("               {}", style(hint).dim());
        }
    }

    println!();
    println!(
        "{} Selected backend: {} (language: {})",
        style("→").cyan(),
        settings.backend,
        settings.ocr.language
    );
    Ok(())
}

fn probe(
    settings: &Settings,
    backend_type: OcrBackendType,
) -> (console::StyledObject<&'static str>, Option<String>) {
    match backend_type {
        OcrBackendType::Tesseract => {
            let tesseract = TesseractBackend::with_config(settings.ocr.clone());
            if tesseract.is_available() {
                (style("✓ available").green(), None)
            } else {
                (
                    style("✗ not available").red(),
                    Some(tesseract.availability_hint()),
                )
            }
        }
        OcrBackendType::Command => match CommandBackend::from_config(&settings.ocr) {
            Ok(command) if command.is_available() => (style("✓ available").green(), None),
            Ok(command) => (
                style("✗ not available").red(),
                Some(command.availability_hint()),
            ),
            Err(e) => (style("○ not configured").yellow(), Some(e.to_string())),
        },
        OcrBackendType::PaddleOcr => probe_paddle(settings),
    }
}

#[cfg(feature = "ocr-paddle")]
fn probe_paddle(settings: &Settings) -> (console::StyledObject<&'static str>, Option<String>) {
    use crate::ocr::PaddleBackend;

    let mut config = settings.ocr.clone();
    config
        .model_path
        .get_or_insert_with(|| settings.data_dir.join("models"));

    match PaddleBackend::installed_models(&config) {
        Some(dir) => (
            style("✓ available").green(),
            Some(format!("models in {}", dir.display())),
        ),
        None => (
            style("○ models will auto-download").yellow(),
            None,
        ),
    }
}

#[cfg(not(feature = "ocr-paddle"))]
fn probe_paddle(_settings: &Settings) -> (console::StyledObject<&'static str>, Option<String>) {
    (
        style("not compiled (enable ocr-paddle feature)").dim(),
        None,
    )
}
