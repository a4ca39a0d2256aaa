//! HTTP error responses.

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors a request can end with before or around document processing.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Rejected upload or failed extraction the caller can act on.
    #[error("{0}")]
    BadRequest(String),

    /// Upload exceeds the configured limit (in MiB).
    #[error("File too large. Maximum size is {0}MB")]
    PayloadTooLarge(usize),

    /// Anything unexpected; the detail is logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a multipart read failure, keeping body-limit rejections as 413.
    pub fn from_multipart(err: MultipartError, limit_mb: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(limit_mb)
        } else {
            Self::BadRequest(format!("Failed to read upload: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = match &self {
            Self::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (self.status_code(), Json(ErrorResponse { detail })).into_response()
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(format!("Invalid multipart request: {}", rejection.body_text()))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("processing task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("File must be a PDF".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::PayloadTooLarge(50).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_too_large_message() {
        assert_eq!(
            ApiError::PayloadTooLarge(50).to_string(),
            "File too large. Maximum size is 50MB"
        );
    }
}
