//! HTTP error handling
//!
//! Every non-2xx response carries `{"detail": "...", "code": "..."}`; clients
//! read `detail`.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use toc_core::SectionServiceError;

/// HTTP error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct HttpError {
    /// User-facing error message
    pub detail: String,
    /// Machine-readable error code
    pub code: String,
}

impl HttpError {
    /// Create a new HTTP error
    pub fn new(detail: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code: code.into(),
        }
    }

    /// Create a 400 error for malformed request input
    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::new(detail, "INVALID_INPUT")
    }

    /// Status code for this error's code
    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "INVALID_INPUT" | "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// `Json` extractor whose rejections are reported as [`HttpError`]
///
/// Bodies that are not JSON, miss a required field, or carry an unknown enum
/// value answer 400 with a `detail` instead of axum's plain-text rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(HttpError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::invalid_input(rejection.body_text())
    }
}

impl From<SectionServiceError> for HttpError {
    fn from(err: SectionServiceError) -> Self {
        match err {
            SectionServiceError::Validation(message) => HttpError::new(message, "VALIDATION_ERROR"),
            SectionServiceError::NotFound { .. } | SectionServiceError::SourceNotFound { .. } => {
                HttpError::new(err.to_string(), "NOT_FOUND")
            }
            SectionServiceError::Conflict(message) => HttpError::new(message, "CONFLICT"),
            SectionServiceError::SourceUnreadable { .. } => {
                tracing::error!("{}", err);
                HttpError::new(err.to_string(), "IO_ERROR")
            }
            SectionServiceError::Database(_) => {
                tracing::error!("{}", err);
                HttpError::new(err.to_string(), "DATABASE_ERROR")
            }
        }
    }
}
