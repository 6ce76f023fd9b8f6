//! Temporary on-disk copies of uploaded images.
//!
//! Recognizers take a file path, so every upload is written to a uniquely
//! named temporary file that lives for exactly one request.

use std::io;
use std::path::{Path, PathBuf};

use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Extension used when the upload's filename doesn't provide one.
pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Derive a file suffix (with leading dot) from an optional filename hint.
pub fn infer_extension(filename_hint: Option<&str>) -> String {
    filename_hint
        .filter(|name| !name.is_empty())
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Errors while materializing an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The incoming stream failed (client disconnect, malformed body, size limit).
    #[error("failed to read upload: {0}")]
    Read(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The temporary file could not be created or written.
    #[error("failed to write temporary file: {0}")]
    Io(#[from] io::Error),
}

/// A materialized upload.
///
/// Owns its path until [`TempUpload::remove`] is called or the handle is
/// dropped; either way the file is deleted if it still exists.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    removed: bool,
}

impl TempUpload {
    /// Create an empty, uniquely named file in `dir`.
    pub fn create(dir: &Path, filename_hint: Option<&str>) -> io::Result<(Self, std::fs::File)> {
        let suffix = infer_extension(filename_hint);
        let (file, path) = tempfile::Builder::new()
            .prefix("scan-")
            .suffix(&suffix)
            .tempfile_in(dir)?
            .keep()
            .map_err(|e| e.error)?;

        Ok((
            Self {
                path,
                removed: false,
            },
            file,
        ))
    }

    /// Write an upload stream to a new temporary file.
    ///
    /// A partially written file is removed before the error is returned.
    pub async fn materialize<S, B, E>(
        dir: &Path,
        filename_hint: Option<&str>,
        mut stream: S,
    ) -> Result<Self, UploadError>
    where
        S: Stream<Item = Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (upload, file) = Self::create(dir, filename_hint)?;
        let mut file = tokio::fs::File::from_std(file);

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| UploadError::Read(e.into()))?;
            file.write_all(chunk.as_ref()).await?;
        }
        file.flush().await?;

        Ok(upload)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now, tolerating one that is already gone.
    pub fn remove(mut self) -> io::Result<()> {
        self.removed = true;
        remove_if_exists(&self.path)
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = remove_if_exists(&self.path) {
            tracing::warn!(
                "Failed to remove temporary upload {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
