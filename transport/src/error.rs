//! Error types for HTTP handlers.
//!
//! This module defines the error type that bridges [`CoreError`], the
//! uniform error taxonomy every command/query handler returns, and HTTP
//! responses via Axum's `IntoResponse` trait.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use composable_rust_core::CoreError;
use serde::Serialize;
use std::fmt;

/// Application error type for HTTP handlers.
///
/// Wraps [`CoreError`] (or any other domain error) and renders it as the
/// HTTP status + JSON body spec'd in the error handling design: `code` is
/// a stable machine-readable string, `message` is safe to show a caller.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Data>, AppError> {
///     let link = bus.dispatch(&ctx, &query).await?; // CoreError -> AppError via `?`
///     Ok(Json(link))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    #[allow(dead_code)]
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST".to_string())
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message.into(), "FORBIDDEN".to_string())
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT".to_string())
    }

    /// Create a 412 Precondition Failed error.
    #[must_use]
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::PRECONDITION_FAILED,
            message.into(),
            "FAILED_PRECONDITION".to_string(),
        )
    }

    /// Create a 429 Too Many Requests error.
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message.into(), "RATE_LIMITED".to_string())
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "internal server error"
                );
            }
        }

        // Spec §8: internal-error messages never reach the caller verbatim.
        let message = if self.status.is_server_error() {
            "an internal error occurred".to_string()
        } else {
            self.message
        };

        let body = ErrorResponse { code: self.code, message };
        (self.status, Json(body)).into_response()
    }
}

/// Map [`CoreError`]'s seven-kind taxonomy onto HTTP status per spec §8.
impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidArgument(msg) => Self::bad_request(msg),
            CoreError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg, "NOT_FOUND".to_string()),
            CoreError::Conflict(msg) => Self::conflict(msg),
            CoreError::FailedPrecondition(msg) => Self::precondition_failed(msg),
            CoreError::NotAuthorized(msg) => Self::forbidden(msg),
            CoreError::RateLimited(msg) => Self::rate_limited(msg),
            CoreError::NotRegistered(msg) => Self::internal(msg),
            CoreError::Cancelled => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "request was cancelled".to_string(),
                "CANCELLED".to_string(),
            ),
            CoreError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("an internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_message() {
        let err = AppError::bad_request("Invalid input");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Invalid input");
    }

    #[test]
    fn not_found_formats_resource_and_id() {
        let err = AppError::not_found("ShortLink", "abc123");
        assert_eq!(err.to_string(), "[NOT_FOUND] ShortLink with id abc123 not found");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn core_error_kinds_map_to_the_spec_d_status_codes() {
        assert_eq!(AppError::from(CoreError::invalid("x")).status, StatusCode::BAD_REQUEST);
        assert_eq!(AppError::from(CoreError::not_found("x")).status, StatusCode::NOT_FOUND);
        assert_eq!(AppError::from(CoreError::conflict("x")).status, StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(CoreError::FailedPrecondition("x".into())).status,
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            AppError::from(CoreError::NotAuthorized("x".into())).status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(CoreError::RateLimited("x".into())).status,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(AppError::from(CoreError::Internal("x".into())).status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
