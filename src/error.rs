//! Error types for the Natours server

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::api::ResponseStatus;

/// Stable error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationFailed,
    InvalidId,
    BadRequest,
    Duplicate,
    MethodNotAllowed,
    RequestTimeout,
    DatabaseError,
    ServiceUnavailable,
    InternalError,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    /// `fail` for client errors, `error` for server errors
    pub status: ResponseStatus,
    pub code: ErrorCode,
    pub message: String,
}

impl AppError {
    /// HTTP status and client-safe code for this error
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::ValidationFailed),
            AppError::InvalidId(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidId),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Duplicate),
            AppError::MethodNotAllowed(_) => {
                (StatusCode::METHOD_NOT_ALLOWED, ErrorCode::MethodNotAllowed)
            }
            AppError::Timeout => (StatusCode::REQUEST_TIMEOUT, ErrorCode::RequestTimeout),
            AppError::Database(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::DatabaseError)
            }
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError),
            AppError::Unavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::ServiceUnavailable)
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match self {
            AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::MethodNotAllowed(msg) => msg,
            AppError::Timeout => "Request took too long to complete".to_string(),
            AppError::InvalidId(id) => format!("Invalid tour id: {}", id),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Unavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                "Service temporarily unavailable".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        let body = Json(ErrorResponse {
            status: if status.is_server_error() {
                ResponseStatus::Error
            } else {
                ResponseStatus::Fail
            },
            code,
            message,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value for {}", field),
                })
            })
            .collect();
        // HashMap iteration order is unstable
        messages.sort();
        AppError::Validation(messages.join("; "))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
