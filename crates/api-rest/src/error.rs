//! API error types and their HTTP mapping.
//!
//! Every handler failure funnels into [`ApiError`], which renders the flat
//! `{"error": "..."}` body the web client expects. Two deliberate quirks
//! are preserved from the system this replaces: uniqueness conflicts map to
//! 400 (not 409), and internal errors always present the same generic
//! message while the real cause goes to the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use labo_core::LabError;

/// Flat error body: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("authentication required")]
    Authentication,
    #[error("insufficient permissions")]
    Authorization,
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            // 400 for conflicts, as the original API always answered.
            ApiError::Conflict(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            ApiError::Authentication => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            ApiError::Authorization => (
                StatusCode::FORBIDDEN,
                "Insufficient permissions".to_string(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal API error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<LabError> for ApiError {
    fn from(err: LabError) -> Self {
        match err {
            LabError::InvalidInput(message) => ApiError::Validation(message),
            LabError::DuplicateCin(_) | LabError::DuplicateTypeName(_) => {
                ApiError::Conflict(err.to_string())
            }
            LabError::PatientNotFound(_)
            | LabError::RequestNotFound(_)
            | LabError::ResultNotFound(_) => ApiError::NotFound(err.to_string()),
            LabError::AnalysisTypeMissing { .. } | LabError::StorePoisoned => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}
