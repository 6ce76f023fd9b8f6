//! API endpoint handlers.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::Instrument;

use super::super::AppState;
use super::types::{ApiError, ScanResponse, StatusResponse};

/// Multipart field name clients are expected to use.
const UPLOAD_FIELD: &str = "file";

/// Liveness probe.
pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "OCR Service is running".to_string(),
    })
}

/// Run OCR on one uploaded image.
pub async fn scan(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ScanResponse>, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::Unprocessable(e.body_text()))?;

    let span = tracing::info_span!("scan", request_id = %uuid::Uuid::new_v4());
    scan_multipart(&state, multipart).instrument(span).await
}

/// The upload is the first part named `file` that carries a filename.
/// Every other part is skipped.
async fn scan_multipart(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<Json<ScanResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Unprocessable(e.body_text()))?
    {
        let is_upload = field.name() == Some(UPLOAD_FIELD) && field.file_name().is_some();
        if !is_upload {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let output = state
            .scan
            .scan_upload(filename.as_deref(), Box::pin(field))
            .await?;

        tracing::info!(
            "Scanned {} line(s) ({} low confidence) in {} ms",
            output.lines.len(),
            output.low_confidence,
            output.processing_time_ms
        );
        return Ok(Json(ScanResponse { text: output.text }));
    }

    Err(ApiError::Unprocessable(format!(
        "missing multipart file field '{}'",
        UPLOAD_FIELD
    )))
}
