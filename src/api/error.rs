//! Error type for HTTP handlers.
//!
//! Bridges domain errors and HTTP responses, implementing Axum's
//! `IntoResponse` trait.

use crate::error::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

/// Application error type for HTTP handlers.
///
/// Wraps domain errors and provides HTTP-friendly error responses.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Data>, ApiError> {
///     let incident = state.lifecycle.approve(ctx, id).await?;
///     Ok(Json(incident))
/// }
/// ```
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
}

impl ApiError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
        }
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
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

    /// The HTTP status this error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Maps the domain error taxonomy onto HTTP statuses.
///
/// Conflicts with the state machine (`InvalidTransition`,
/// `DispatchFailed`, `ResourceAssigned`) are 409s; payload problems
/// (`Validation`, `NoResourcesSelected`, `InvalidResourceStatus`) are
/// 422s. Storage failures are opaque 500s — the detail goes to the log,
/// not the client.
impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            Error::NoResourcesSelected => {
                (StatusCode::UNPROCESSABLE_ENTITY, "NO_RESOURCES_SELECTED")
            }
            Error::DispatchFailed { .. } => (StatusCode::CONFLICT, "DISPATCH_FAILED"),
            Error::ResourceAssigned => (StatusCode::CONFLICT, "RESOURCE_ASSIGNED"),
            Error::InvalidResourceStatus { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_RESOURCE_STATUS")
            }
            Error::Forbidden { .. } => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Error::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Error::Storage(detail) => {
                tracing::error!(error = %detail, "storage failure");
                return Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    "INTERNAL_SERVER_ERROR".to_string(),
                );
            }
        };
        Self::new(status, err.to_string(), code.to_string())
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

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                "Internal server error"
            );
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}
