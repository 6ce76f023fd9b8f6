//! Web server command.

use console::style;

use crate::config::{parse_bind_address, Settings};

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;

    if let Err(e) = settings.ensure_directories() {
        eprintln!("  {} {}", style("✗").red(), e);
        return Err(e.into());
    }

    println!(
        "{} Loading {} OCR backend (language: {})...",
        style("→").cyan(),
        settings.backend,
        settings.ocr.language
    );

    println!(
        "{} Starting OCR service at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}
