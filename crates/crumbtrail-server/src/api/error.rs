//! Error responses for API handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crumbtrail_core::CrumbtrailError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// A failed request: the status to answer with and the JSON body.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Body of the response.
    #[must_use]
    pub const fn body(&self) -> &ErrorResponse {
        &self.body
    }
}

/// JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "storage_error",
    "message": "Trail storage error: Database error: disk I/O error"
}))]
pub struct ErrorResponse {
    /// Machine-readable error code.
    #[schema(example = "storage_error")]
    pub error: String,

    /// Human-readable error message.
    pub message: String,
}

impl From<CrumbtrailError> for ApiError {
    fn from(err: CrumbtrailError) -> Self {
        let status = StatusCode::from_u16(err.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            body: ErrorResponse {
                error: err.error_code().to_lowercase(),
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = self.status.as_u16(),
                error_code = %self.body.error,
                message = %self.body.message,
                "Request failed"
            );
        }
        (self.status, Json(self.body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.body.message)
    }
}

impl std::error::Error for ApiError {}
