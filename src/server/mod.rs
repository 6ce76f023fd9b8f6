//! Web server exposing the scan endpoint.
//!
//! - `GET /` liveness probe
//! - `POST /scan` multipart image upload, returns the recognized text

mod handlers;
mod routes;

pub use handlers::{ErrorResponse, ScanResponse, StatusResponse};
pub use routes::create_router;

use std::net::SocketAddr;

use crate::config::Settings;
use crate::ocr::{build_backend, Normalizer};
use crate::services::ScanService;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub scan: ScanService,
    /// Request body cap; `None` disables the limit.
    pub max_upload_bytes: Option<usize>,
}

impl AppState {
    /// Build the OCR backend once and wrap it for request handlers.
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let ocr_config = settings.backend_config();
        let backend_type = settings.backend;
        tracing::info!("Loading {} OCR backend...", backend_type);

        // Model loading can block for a while (downloads, ONNX init).
        let backend =
            tokio::task::spawn_blocking(move || build_backend(&ocr_config, backend_type))
                .await??;
        tracing::info!("{}", backend.availability_hint());

        Ok(Self {
            scan: ScanService::new(
                backend,
                Normalizer::new(settings.low_confidence_threshold),
                settings.temp_dir.clone(),
            ),
            max_upload_bytes: settings.max_upload_bytes,
        })
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings).await?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::json;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::ocr::{LegacyLine, RecognitionResult, StructuredResult};
    use crate::services::scan::testing::StaticBackend;

    const BOUNDARY: &str = "X-OCR-TEST-BOUNDARY";

    fn setup_test_app(
        backend: Arc<StaticBackend>,
        temp_dir: &Path,
        max_upload_bytes: Option<usize>,
    ) -> axum::Router {
        let state = AppState {
            scan: ScanService::new(backend, Normalizer::default(), temp_dir.to_path_buf()),
            max_upload_bytes,
        };
        create_router(state)
    }

    fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        name
                    )
                    .as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn scan_request(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/scan")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn upload(filename: &str) -> Request<Body> {
        scan_request(&[("file", Some(filename), &b"fake image bytes"[..])])
    }

    async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn assert_no_leftovers(dir: &Path) {
        let left: Vec<_> = std::fs::read_dir(dir).unwrap().collect();
        assert!(left.is_empty(), "temporary files left behind: {:?}", left);
    }

    #[tokio::test]
    async fn test_root_reports_running() {
        let dir = tempdir().unwrap();
        let app = setup_test_app(
            Arc::new(StaticBackend::ok(RecognitionResult::Empty)),
            dir.path(),
            None,
        );

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"message": "OCR Service is running"}));
    }

    #[tokio::test]
    async fn test_scan_structured_result() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Structured(
            StructuredResult {
                recognized_texts: vec!["TOTAL".into(), "42.00".into()],
                confidence_scores: vec![0.95, 0.99],
            },
        )));
        let app = setup_test_app(backend.clone(), dir.path(), None);

        let (status, json) = send(app, upload("receipt.png")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"text": "TOTAL\n42.00"}));

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1, "file should exist while recognizing");
        assert_eq!(calls[0].2, b"fake image bytes");
        assert_no_leftovers(dir.path());
    }

    #[tokio::test]
    async fn test_scan_legacy_result() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Legacy(vec![
            LegacyLine::new(vec![[0.0, 0.0], [5.0, 0.0]], "HELLO", 0.91),
            LegacyLine::new(vec![[0.0, 9.0], [5.0, 9.0]], "WORLD", 0.5),
        ])));
        let app = setup_test_app(backend, dir.path(), None);

        let (status, json) = send(app, upload("note.jpeg")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"text": "HELLO\nWORLD"}));
        assert_no_leftovers(dir.path());
    }

    #[tokio::test]
    async fn test_scan_empty_result() {
        let dir = tempdir().unwrap();
        let app = setup_test_app(
            Arc::new(StaticBackend::ok(RecognitionResult::Empty)),
            dir.path(),
            None,
        );

        let (status, json) = send(app, upload("blank.png")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"text": ""}));
    }

    #[tokio::test]
    async fn test_scan_recognition_failure() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(StaticBackend::failing("cannot identify image file"));
        let app = setup_test_app(backend.clone(), dir.path(), None);

        let (status, json) = send(app, upload("corrupt.png")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json,
            json!({"detail": "OCR failed: cannot identify image file"})
        );
        assert_eq!(backend.seen_paths().len(), 1);
        assert!(!backend.seen_paths()[0].exists());
        assert_no_leftovers(dir.path());
    }

    #[tokio::test]
    async fn test_scan_without_extension_uses_jpg() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Empty));
        let app = setup_test_app(backend.clone(), dir.path(), None);

        let (status, _) = send(app, upload("receipt")).await;

        assert_eq!(status, StatusCode::OK);
        let paths = backend.seen_paths();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].extension().unwrap(), "jpg");
    }

    #[tokio::test]
    async fn test_scan_reads_only_the_file_field() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Empty));
        let app = setup_test_app(backend.clone(), dir.path(), None);

        let request = scan_request(&[
            ("avatar", Some("me.gif"), &b"AVATAR"[..]),
            ("note", None, &b"not the image"[..]),
            ("file", Some("receipt.png"), &b"RECEIPT"[..]),
        ]);
        let (status, _) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].2, b"RECEIPT");
        assert_eq!(calls[0].0.extension().unwrap(), "png");
    }

    #[tokio::test]
    async fn test_scan_file_field_without_filename_is_rejected() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Empty));
        let app = setup_test_app(backend.clone(), dir.path(), None);

        let (status, json) = send(app, scan_request(&[("file", None, &b"raw"[..])])).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["detail"].as_str().unwrap().contains("file"));
        assert!(backend.seen_paths().is_empty());
    }

    #[tokio::test]
    async fn test_scan_missing_file_field() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Empty));
        let app = setup_test_app(backend.clone(), dir.path(), None);

        let (status, json) = send(app, scan_request(&[("note", None, &b"hello"[..])])).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["detail"].as_str().unwrap().contains("file"));
        assert!(backend.seen_paths().is_empty());
    }

    #[tokio::test]
    async fn test_scan_rejects_non_multipart() {
        let dir = tempdir().unwrap();
        let app = setup_test_app(
            Arc::new(StaticBackend::ok(RecognitionResult::Empty)),
            dir.path(),
            None,
        );

        let request = Request::builder()
            .method("POST")
            .uri("/scan")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["detail"].is_string());
    }

    #[tokio::test]
    async fn test_scan_storage_failure_is_generic_500() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Empty));
        let app = setup_test_app(backend.clone(), &dir.path().join("gone"), None);

        let (status, json) = send(app, upload("receipt.png")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"detail": "Internal Server Error"}));
        assert!(backend.seen_paths().is_empty());
    }

    #[tokio::test]
    async fn test_large_upload_accepted_without_limit() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Empty));
        let app = setup_test_app(backend.clone(), dir.path(), None);

        // Larger than axum's 2 MB default body limit.
        let big = vec![0u8; 3 * 1024 * 1024];
        let (status, _) = send(app, scan_request(&[("file", Some("big.png"), big.as_slice())])).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(backend.calls.lock().unwrap()[0].2.len(), big.len());
        assert_no_leftovers(dir.path());
    }

    #[tokio::test]
    async fn test_configured_upload_limit() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Empty));
        let app = setup_test_app(backend.clone(), dir.path(), Some(1024));

        let big = vec![0u8; 64 * 1024];
        let (status, _) = send(app, scan_request(&[("file", Some("big.png"), big.as_slice())])).await;

        assert!(status.is_client_error());
        assert!(backend.seen_paths().is_empty());
        assert_no_leftovers(dir.path());
    }
}
