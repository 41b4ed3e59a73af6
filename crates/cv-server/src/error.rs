//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`cv_core::Error`] so that route handlers
//! can return `Result<T, AppError>` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError {
    inner: cv_core::Error,
}

impl AppError {
    pub fn new(inner: cv_core::Error) -> Self {
        Self { inner }
    }
}

impl From<cv_core::Error> for AppError {
    fn from(e: cv_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let code = match &self.inner {
            cv_core::Error::NotFound { .. } => "not_found",
            cv_core::Error::Unauthorized(_) => "unauthorized",
            cv_core::Error::Validation(_) => "validation_error",
            cv_core::Error::Conflict(_) => "conflict",
            cv_core::Error::Database { .. } => "database_error",
            cv_core::Error::Io { .. } => "io_error",
            cv_core::Error::Tool { .. } => "tool_error",
            cv_core::Error::Internal(_) => "internal_error",
        };

        // 5xx detail stays in the logs; clients get a generic body.
        let message = if status.is_server_error() {
            "Server error".to_string()
        } else {
            self.inner.to_string()
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
