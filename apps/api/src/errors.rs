use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::review::pipeline::{AnalysisFailure, FailureKind};
use crate::review::repository::RepositoryError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisFailure),
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(id) => AppError::NotFound(format!("Resume {id} not found")),
            RepositoryError::ReadError(msg) => AppError::Storage(msg),
            e @ RepositoryError::MalformedRecord { .. } => AppError::MalformedRecord(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::MalformedRecord(msg) => {
                tracing::error!("{msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MALFORMED_RECORD",
                    "The stored resume data is unreadable".to_string(),
                )
            }
            AppError::Analysis(failure) => {
                tracing::error!("Analysis failed: {failure}");
                let (status, code) = match failure.kind {
                    FailureKind::UploadFailed => (StatusCode::BAD_GATEWAY, "UPLOAD_FAILED"),
                    FailureKind::ConversionFailed => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "CONVERSION_FAILED")
                    }
                    FailureKind::PersistFailed => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "PERSIST_FAILED")
                    }
                    FailureKind::InferenceFailed => (StatusCode::BAD_GATEWAY, "INFERENCE_FAILED"),
                    FailureKind::MalformedFeedback => {
                        (StatusCode::BAD_GATEWAY, "MALFORMED_FEEDBACK")
                    }
                };
                let body = Json(json!({
                    "error": {
                        "code": code,
                        "message": failure.kind.reason(),
                        "draft_id": failure.draft_id,
                    }
                }));
                return (status, body).into_response();
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
