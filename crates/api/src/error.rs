use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use seo_writer_core::error::CoreError;
use seo_writer_db::models::job::Job;
use seo_writer_db::store::StoreError;

use crate::engine::submission::SubmitError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`StoreError`] for persistence
/// errors, and adds HTTP-specific variants. Implements [`IntoResponse`] to
/// produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `seo_writer_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A persistence error from `seo_writer_db`.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The job was created but the worker could not be triggered. The failed
    /// job is returned alongside the error.
    #[error("Dispatch failed for job {}", .0.id)]
    DispatchFailed(Box<Job>),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// Status, machine-readable code, message, and optional extra top-level
/// fields for the error body.
type ErrorParts = (StatusCode, &'static str, String, Option<(&'static str, Value)>);

fn internal() -> ErrorParts {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
        None,
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, extra) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                    None,
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone(), None)
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone(), None),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None)
                }
                CoreError::QuotaExceeded { used, limit } => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "QUOTA_EXCEEDED",
                    "Monthly article quota exceeded".to_string(),
                    Some((
                        "details",
                        json!({ "current_usage": used, "quota": limit }),
                    )),
                ),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Store errors ---
            AppError::Store(err) => classify_store_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None)
            }
            AppError::DispatchFailed(job) => (
                StatusCode::BAD_GATEWAY,
                "DISPATCH_FAILED",
                job.error_message
                    .clone()
                    .unwrap_or_else(|| "Failed to dispatch job".to_string()),
                Some(("data", json!(job))),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some((key, value)) = extra {
            body[key] = value;
        }

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a store error into an HTTP status, error code, and message.
///
/// Lost races and illegal edges surface as 409; undecodable rows and
/// database failures are logged and sanitized to 500.
fn classify_store_error(err: &StoreError) -> ErrorParts {
    match err {
        StoreError::NotFound { id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Job with id {id} not found"),
            None,
        ),
        StoreError::Conflict { .. } | StoreError::Lifecycle(_) => {
            (StatusCode::CONFLICT, "CONFLICT", err.to_string(), None)
        }
        StoreError::Database(db) => classify_sqlx_error(db),
        StoreError::Corrupt(msg) => {
            tracing::error!(error = %msg, "Corrupt record");
            internal()
        }
    }
}

/// Classify a sqlx error.
///
/// - `RowNotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> ErrorParts {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
            None,
        ),
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::QuotaExceeded { used, limit } => {
                AppError::Core(CoreError::QuotaExceeded { used, limit })
            }
            SubmitError::Store(e) => AppError::Store(e),
        }
    }
}

/// Malformed or wrongly typed JSON bodies answer 400 with the usual error
/// envelope instead of axum's plain-text rejection.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
