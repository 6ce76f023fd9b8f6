//! Scan service.
//!
//! Runs one upload through the pipeline: write it to a temporary file,
//! recognize it, normalize the result, and remove the file again.

mod types;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::Stream;

use crate::ocr::{Normalizer, OcrBackend};
use crate::storage::TempUpload;

pub use types::{ScanError, ScanOutput};

/// Number of leading bytes inspected for file-type diagnostics.
const HEADER_PEEK_BYTES: usize = 20;

/// Service that turns uploaded images into text.
///
/// Holds the single recognizer built at startup; cloning shares it.
#[derive(Clone)]
pub struct ScanService {
    backend: Arc<dyn OcrBackend>,
    normalizer: Normalizer,
    temp_dir: PathBuf,
}

impl ScanService {
    /// Create a new scan service.
    pub fn new(backend: Arc<dyn OcrBackend>, normalizer: Normalizer, temp_dir: PathBuf) -> Self {
        Self {
            backend,
            normalizer,
            temp_dir,
        }
    }

    pub fn backend(&self) -> &dyn OcrBackend {
        self.backend.as_ref()
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Materialize an upload stream and scan it.
    ///
    /// The temporary file is removed before this returns, whatever the outcome.
    pub async fn scan_upload<S, B, E>(
        &self,
        filename: Option<&str>,
        stream: S,
    ) -> Result<ScanOutput, ScanError>
    where
        S: Stream<Item = Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let upload = TempUpload::materialize(&self.temp_dir, filename, stream).await?;

        tracing::debug!(
            "Received file: {}, path: {}",
            filename.unwrap_or("<unnamed>"),
            upload.path().display()
        );

        let result = self.scan_file(upload.path()).await;

        if let Err(e) = upload.remove() {
            tracing::warn!("Failed to remove temporary upload: {}", e);
        }

        result
    }

    /// Recognize and normalize a file that is already on disk.
    pub async fn scan_file(&self, path: &Path) -> Result<ScanOutput, ScanError> {
        let start = Instant::now();
        log_file_details(path).map_err(ScanError::Storage)?;

        let backend = Arc::clone(&self.backend);
        let image_path = path.to_path_buf();
        let raw = tokio::task::spawn_blocking(move || backend.recognize(&image_path))
            .await
            .map_err(|e| ScanError::Worker(e.to_string()))??;

        tracing::debug!("OCR raw result ({}): {:?}", raw.shape(), raw);

        let lines = self.normalizer.lines(&raw);
        let low_confidence = lines
            .iter()
            .filter(|line| self.normalizer.is_low_confidence(line))
            .count();
        let text = self.normalizer.join(&lines);

        tracing::debug!("Full extracted text: {}", text);

        Ok(ScanOutput {
            text,
            lines,
            low_confidence,
            shape: raw.shape(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Log size and sniffed type of an upload, which catches HTML error pages
/// posted in place of images.
fn log_file_details(path: &Path) -> std::io::Result<()> {
    let mut file = std::fs::File::open(path)?;
    let size = file.metadata()?.len();

    let mut head = Vec::with_capacity(HEADER_PEEK_BYTES);
    (&mut file)
        .take(HEADER_PEEK_BYTES as u64)
        .read_to_end(&mut head)?;

    let kind = infer::get(&head)
        .map(|k| k.mime_type())
        .unwrap_or("unknown");
    tracing::debug!(
        "Upload {}: {} bytes, detected type {}, header {:?}",
        path.display(),
        size,
        kind,
        String::from_utf8_lossy(&head)
    );
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::StaticBackend;
    use super::*;
    use crate::ocr::{LegacyLine, RecognitionResult, StructuredResult};
    use futures::stream;

    fn service(backend: Arc<StaticBackend>, dir: &Path) -> ScanService {
        ScanService::new(backend, Normalizer::default(), dir.to_path_buf())
    }

    fn body(bytes: &'static [u8]) -> impl Stream<Item = std::io::Result<&'static [u8]>> + Unpin {
        stream::iter(vec![Ok(bytes)])
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_scan_upload_structured() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Structured(
            StructuredResult {
                recognized_texts: vec!["TOTAL".into(), "42.00".into()],
                confidence_scores: vec![0.95, 0.99],
            },
        )));

        let output = service(backend.clone(), dir.path())
            .scan_upload(Some("receipt.png"), body(b"image bytes"))
            .await
            .unwrap();

        assert_eq!(output.text, "TOTAL\n42.00");
        assert_eq!(output.low_confidence, 0);
        assert_eq!(output.shape, "structured");

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (path, existed, bytes) = &calls[0];
        assert!(*existed);
        assert_eq!(bytes, b"image bytes");
        assert_eq!(path.extension().unwrap(), "png");
        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_scan_upload_counts_low_confidence() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Legacy(vec![
            LegacyLine::new(vec![], "HELLO", 0.91),
            LegacyLine::new(vec![], "WORLD", 0.5),
        ])));

        let output = service(backend, dir.path())
            .scan_upload(None, body(b"x"))
            .await
            .unwrap();

        assert_eq!(output.text, "HELLO\nWORLD");
        assert_eq!(output.low_confidence, 1);
        assert_eq!(output.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_recognition_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(StaticBackend::failing("image file is truncated"));

        let err = service(backend.clone(), dir.path())
            .scan_upload(Some("broken"), body(b"\xff\xd8"))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Recognition(_)));
        assert_eq!(err.to_string(), "OCR failed: image file is truncated");

        let paths = backend.seen_paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].to_string_lossy().ends_with(".jpg"));
        assert!(!paths[0].exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Empty));
        let missing = dir.path().join("missing");

        let err = service(backend.clone(), &missing)
            .scan_upload(None, body(b"x"))
            .await
            .unwrap_err();

        assert!(matches!(err, ScanError::Storage(_)));
        assert!(backend.seen_paths().is_empty());
    }

    #[tokio::test]
    async fn test_scan_file_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("blank.png");
        std::fs::write(&image, b"\x89PNG\r\n\x1a\n").unwrap();
        let backend = Arc::new(StaticBackend::ok(RecognitionResult::Empty));

        let output = service(backend, dir.path()).scan_file(&image).await.unwrap();
        assert_eq!(output.text, "");
        assert!(output.lines.is_empty());
        // scan_file never deletes caller-owned files
        assert!(image.exists());
    }
}
