use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::storage::StorageError;
use crate::wizard::edit::EditError;
use crate::wizard::machine::Blocked;
use crate::wizard::photo::PhotoError;

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

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<Blocked> for AppError {
    fn from(blocked: Blocked) -> Self {
        match blocked {
            Blocked::Invalid(e) => AppError::Validation(e.to_string()),
            Blocked::BackendOffline => AppError::ServiceUnavailable(blocked.to_string()),
            other => AppError::Conflict(other.to_string()),
        }
    }
}

impl From<EditError> for AppError {
    fn from(e: EditError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<PhotoError> for AppError {
    fn from(e: PhotoError) -> Self {
        match &e {
            PhotoError::TooLarge { size } => {
                debug!("Rejected {size}-byte photo upload");
                AppError::PayloadTooLarge(e.to_string())
            }
            PhotoError::NotAnImage { mime } => {
                debug!("Rejected photo upload of type '{mime}'");
                AppError::Validation(e.to_string())
            }
            PhotoError::Empty => AppError::Validation(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "BACKEND_UNAVAILABLE",
                msg.clone(),
            ),
            AppError::Submission(msg) => {
                tracing::warn!("Submission error: {msg}");
                (StatusCode::BAD_GATEWAY, "SUBMISSION_FAILED", msg.clone())
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
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
    use crate::wizard::validation::StepError;

    #[test]
    fn test_blocked_mapping() {
        let validation: AppError = Blocked::Invalid(StepError::FullNameRequired).into();
        assert!(matches!(validation, AppError::Validation(ref m) if m == "Full Name is required"));

        let offline: AppError = Blocked::BackendOffline.into();
        assert_eq!(offline.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        let busy: AppError = Blocked::SubmitInProgress.into();
        assert_eq!(busy.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_photo_too_large_maps_to_413() {
        let err: AppError = PhotoError::TooLarge { size: 6 << 20 }.into();
        assert_eq!(err.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
