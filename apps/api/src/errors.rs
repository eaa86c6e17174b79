use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::progression::errors::{ErrorKind, ProgressionError};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<ProgressionError> for AppError {
    fn from(err: ProgressionError) -> Self {
        let message = err.to_string();
        if err.is_retryable() {
            return AppError::Conflict(message);
        }
        match err.kind() {
            ErrorKind::BadInput => AppError::Validation(message),
            ErrorKind::NotFound => AppError::NotFound(message),
            ErrorKind::Conflict => AppError::Conflict(message),
            ErrorKind::Storage => AppError::Storage(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => {
                tracing::warn!("Conflict: {msg}");
                (StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::store::StoreError;
    use uuid::Uuid;

    #[test]
    fn test_progression_errors_map_to_status() {
        let cases = [
            (
                ProgressionError::UnknownCompetency("juggling".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ProgressionError::JourneyNotFound(Uuid::nil()),
                StatusCode::NOT_FOUND,
            ),
            (
                ProgressionError::Conflict("stale".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                ProgressionError::from(StoreError::Corrupt("bad band".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
