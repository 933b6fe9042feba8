use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tailpress_core::compiler::CompilerError;
use tailpress_core::error::JobError;

use crate::response::ErrorResponse;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`JobError`] for pipeline failures and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce the `{status: "error", errors}`
/// envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A compilation job failed.
    #[error(transparent)]
    Job(#[from] JobError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // --- Job pipeline ---
            AppError::Job(job) => match job {
                JobError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
                JobError::WorkspaceWrite(e) => {
                    tracing::error!(file = e.file, error = %e.source, "Workspace write failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                }
                JobError::Compiler(e @ CompilerError::Timeout { .. }) => {
                    (StatusCode::GATEWAY_TIMEOUT, e.to_string())
                }
                JobError::Compiler(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, axum::Json(ErrorResponse::new(message))).into_response()
    }
}
