//! Request/response bodies for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::services::ScanError;

/// Body of `GET /`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
}

/// Successful scan.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResponse {
    pub text: String,
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Errors surfaced by handlers, mapped once to a status code.
#[derive(Debug)]
pub enum ApiError {
    /// Request is missing the upload or isn't valid multipart.
    Unprocessable(String),
    /// Scan failed.
    Scan(ScanError),
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        ApiError::Scan(err)
    }
}

impl ApiError {
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ApiError::Scan(ScanError::Upload(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            // Storage faults are server-side; don't leak paths to the client.
            ApiError::Scan(ScanError::Storage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
            ),
            ApiError::Scan(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        match &self {
            ApiError::Unprocessable(msg) | ApiError::Scan(ScanError::Upload(msg)) => {
                tracing::debug!("Rejected scan request: {}", msg)
            }
            ApiError::Scan(err) => tracing::error!("Error executing OCR: {}", err),
        }
        (status, Json(ErrorResponse { detail })).into_response()
    }
}
