//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vdetect_models::ClassificationError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Body could not be read (too large, aborted); keeps the rejection's status.
    #[error("{message}")]
    BodyRejected { status: StatusCode, message: String },

    #[error("{0}")]
    Classification(#[from] ClassificationError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn body_rejected(status: StatusCode, msg: impl Into<String>) -> Self {
        Self::BodyRejected {
            status,
            message: msg.into(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BodyRejected { status, .. } => *status,
            ApiError::Classification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::BodyRejected { .. } => "BODY_REJECTED",
            ApiError::Classification(e) => e.code(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(ClassificationError::fetch_failed("x")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_classification_message_is_passed_through() {
        let err = ApiError::from(ClassificationError::fetch_failed("unsupported source"));
        assert!(err.to_string().contains("unsupported source"));
        assert_eq!(err.code(), "FETCH_FAILED");
    }

    #[test]
    fn test_body_rejection_keeps_status() {
        let err = ApiError::body_rejected(StatusCode::PAYLOAD_TOO_LARGE, "length limit exceeded");
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.to_string(), "length limit exceeded");
    }
}
