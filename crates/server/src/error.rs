//! API error rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use quarry_maven::ErrorResponse;

/// Wrapper turning engine errors into JSON responses.
#[derive(Debug)]
pub struct ApiError(pub ErrorResponse);

impl From<ErrorResponse> for ApiError {
    fn from(err: ErrorResponse) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
