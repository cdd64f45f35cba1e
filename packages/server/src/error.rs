use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::crud::CrudError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `PERMISSION_DENIED`, `CSRF_INVALID`,
    /// `NOT_FOUND`, `CONFLICT`, `STORAGE_ERROR`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Group name must be 3-50 characters")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied,
    CsrfInvalid,
    NotFound(String),
    Conflict(String),
    /// The object store failed or is unreachable.
    Storage(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "INVALID_CREDENTIALS",
                    message: "Invalid email or password".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "Insufficient permissions".into(),
                },
            ),
            AppError::CsrfInvalid => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "CSRF_INVALID",
                    message: "Missing or mismatched CSRF token".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "CONFLICT",
                    message: msg,
                },
            ),
            AppError::Storage(detail) => {
                tracing::error!("Storage error: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody {
                        code: "STORAGE_ERROR",
                        message: "File storage is unavailable".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<CrudError> for AppError {
    fn from(err: CrudError) -> Self {
        if err.is_unique_violation() {
            tracing::debug!("Unique constraint rejected write: {err}");
            return AppError::Conflict("A record with that value already exists".into());
        }
        match err {
            CrudError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            CrudError::UnknownAttribute { .. } => AppError::Validation(err.to_string()),
            CrudError::UnknownRelationship { .. } | CrudError::UnknownColumn { .. } => {
                tracing::error!("Data access misconfigured: {err}");
                AppError::Internal(err.to_string())
            }
            CrudError::Db(e) => AppError::from(e),
        }
    }
}

impl AppError {
    /// Like `From<CrudError>`, but names the duplicate in the 409 message.
    pub fn duplicate(message: impl Into<String>) -> impl FnOnce(CrudError) -> AppError {
        let message = message.into();
        move |err| {
            if err.is_unique_violation() {
                tracing::debug!("Unique constraint rejected write: {err}");
                AppError::Conflict(message)
            } else {
                AppError::from(err)
            }
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => {
                tracing::warn!("Object missing from store: {key}");
                AppError::NotFound("File not found".into())
            }
            StorageError::SizeLimitExceeded { actual, limit } => AppError::Validation(format!(
                "File is {actual} bytes; the limit is {limit} bytes"
            )),
            StorageError::InvalidKey(msg) => AppError::Internal(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}
