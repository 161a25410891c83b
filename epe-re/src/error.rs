//! HTTP error mapping for epe-re
//!
//! Store and alignment errors arrive as `epe_common::Error`; this type turns
//! them into `{"error": {"code", "message"}}` responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Error raised by the store, engine or parser
    #[error(transparent)]
    Core(#[from] epe_common::Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        use epe_common::Error as E;
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Core(err) => match err {
                E::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                E::EmptyInput => (StatusCode::BAD_REQUEST, "EMPTY_INPUT"),
                E::Encoding(_) => (StatusCode::BAD_REQUEST, "ENCODING_ERROR"),
                E::DuplicateId(_) => (StatusCode::CONFLICT, "DUPLICATE_ID"),
                E::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                E::WitnessNotFound(_) => (StatusCode::NOT_FOUND, "WITNESS_NOT_FOUND"),
                E::SectionNotFound(_) => (StatusCode::NOT_FOUND, "SECTION_NOT_FOUND"),
                E::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
                E::Json(_) => (StatusCode::INTERNAL_SERVER_ERROR, "JSON_ERROR"),
                E::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
                E::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = match &self {
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Core(err) => err.to_string(),
        };

        match &self {
            ApiError::Core(err) if !err.is_client_error() => error!("{}: {}", code, message),
            _ => warn!("{}: {}", code, message),
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
