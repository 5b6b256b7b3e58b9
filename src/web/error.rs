//! JSON error responses for the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::error;

use crate::year::AggregateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    InvalidYear,
    BranchFailed,
}

impl ApiErrorCode {
    fn status(self) -> StatusCode {
        match self {
            Self::InvalidYear => StatusCode::BAD_REQUEST,
            Self::BranchFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_year(raw: impl std::fmt::Display) -> Self {
        Self::new(ApiErrorCode::InvalidYear, format!("Invalid year: {raw}"))
    }
}

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        error!(error = %err, "year overview failed");
        Self::new(ApiErrorCode::BranchFailed, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}
