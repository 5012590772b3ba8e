//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use tracing::error;

use wikirelay_core::defaults::GENERAL_ERROR;

/// Error returned by services and handlers. The message is safe to show to
/// the user; internal detail is logged where the error is created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log `err` and replace it with `public` for the caller.
    pub fn internal(err: &wikirelay_core::Error, public: impl Into<String>) -> Self {
        error!(subsystem = "api", error = %err, "Request failed");
        ApiError::Internal(public.into())
    }
}

impl From<wikirelay_core::Error> for ApiError {
    fn from(err: wikirelay_core::Error) -> Self {
        use wikirelay_core::Error;
        match err {
            Error::InvalidInput(msg) | Error::Conflict(msg) => ApiError::BadRequest(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::internal(&other, GENERAL_ERROR),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Internal(msg) => msg,
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
