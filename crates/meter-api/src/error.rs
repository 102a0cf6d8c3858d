//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use meter_core::error::{AppError, ErrorKind};

/// Error response body. Mirrors the socket error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub err: String,
}

/// Wrapper so the foreign `AppError` can implement `IntoResponse` here.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = match err.kind {
            ErrorKind::InvalidName | ErrorKind::TooManyNamespaces | ErrorKind::MalformedCommand => {
                StatusCode::BAD_REQUEST
            }
            ErrorKind::Configuration
            | ErrorKind::Serialization
            | ErrorKind::Io
            | ErrorKind::Internal => {
                tracing::error!(error = %err, "Internal server error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ApiErrorResponse {
            code: err.kind.to_string(),
            err: err.message,
        };

        (status, Json(body)).into_response()
    }
}
