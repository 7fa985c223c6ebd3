//! Service error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Profile already exists")]
    ProfileAlreadyExists,

    #[error("Case not found")]
    CaseNotFound,

    #[error("Case already exists")]
    CaseAlreadyExists,

    #[error("Debate not found")]
    DebateNotFound,

    #[error("Insufficient credits")]
    InsufficientCredits,

    #[error("Case unavailable")]
    CaseUnavailable,

    #[error("Debate already completed")]
    AlreadyCompleted,

    #[error("Debate expired")]
    Expired,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Transient AI failure: {0}")]
    TransientAi(String),

    #[error("Permanent AI failure: {0}")]
    PermanentAi(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ateneo_core::Error> for ApiError {
    fn from(err: ateneo_core::Error) -> Self {
        match err {
            // A malformed report is retryable: the model may produce a
            // well-formed one on the next attempt.
            ateneo_core::Error::MalformedReport(msg) => ApiError::TransientAi(msg),
            ateneo_core::Error::Transient(msg) => ApiError::TransientAi(msg),
            ateneo_core::Error::Permanent(msg) => ApiError::PermanentAi(msg),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Internal(format!("database error: {}", err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("serialization error: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::ProfileNotFound => (StatusCode::NOT_FOUND, "Profile not found"),
            ApiError::CaseNotFound => (StatusCode::NOT_FOUND, "Case not found"),
            ApiError::DebateNotFound => (StatusCode::NOT_FOUND, "Debate not found"),
            ApiError::ProfileAlreadyExists => (StatusCode::CONFLICT, "Profile already exists"),
            ApiError::CaseAlreadyExists => (StatusCode::CONFLICT, "Case already exists"),
            ApiError::InsufficientCredits => {
                (StatusCode::PAYMENT_REQUIRED, "Insufficient credits")
            }
            ApiError::CaseUnavailable => {
                (StatusCode::CONFLICT, "Case already claimed or not available")
            }
            ApiError::AlreadyCompleted => (StatusCode::CONFLICT, "Debate already completed"),
            ApiError::Expired => (StatusCode::GONE, "Debate expired"),
            ApiError::PermissionDenied(msg) => (StatusCode::FORBIDDEN, msg.as_str()),
            ApiError::TransientAi(msg) => {
                tracing::warn!("Transient AI failure: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "AI collaborator temporarily unavailable",
                )
            }
            ApiError::PermanentAi(msg) => {
                tracing::error!("Permanent AI failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "AI collaborator rejected the request")
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "reason": message });
        (status, axum::Json(body)).into_response()
    }
}
