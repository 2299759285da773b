//! Mapping from internal failures to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::domains::products::SearchError;

#[derive(Debug)]
pub enum ApiError {
    /// Bad or missing request parameters (422)
    Validation(String),
    /// Backing store unreachable (503)
    Unavailable,
    /// Anything else (500), message passed through
    Internal(String),
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::StoreUnavailable(e) => {
                error!(error = %e, "Product store unavailable");
                ApiError::Unavailable
            }
            other => {
                error!(error = %other, "Product search failed");
                ApiError::Internal(format!("search failed: {}", other))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(msg) => json_error(StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Unavailable => json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "database connection unavailable, check the PostgreSQL server",
            ),
            ApiError::Internal(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, msg),
        }
    }
}

pub fn json_error(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, axum::Json(json!({ "detail": detail.into() }))).into_response()
}
