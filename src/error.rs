use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::completion::CompletionError;
use crate::search::SearchError;

pub const FORBIDDEN_DETAIL: &str = "Invalid or missing API key";
pub const RATE_LIMITED_DETAIL: &str = "Rate limit exceeded. Try again later.";
pub const COMPLETION_DETAIL: &str = "Language model request failed";
pub const INTERNAL_DETAIL: &str = "Internal server error";

/// Errors surfaced by the query endpoint. Everything that maps to a 500 keeps
/// its cause for the server log only.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid or missing API key")]
    Forbidden,

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("search failed: {0}")]
    Search(#[from] SearchError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Completion(_) | AppError::Search(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            AppError::Forbidden => FORBIDDEN_DETAIL.to_string(),
            AppError::RateLimited => RATE_LIMITED_DETAIL.to_string(),
            AppError::InvalidRequest(msg) => msg.clone(),
            AppError::Completion(_) => COMPLETION_DETAIL.to_string(),
            AppError::Search(_) => INTERNAL_DETAIL.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "query failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "query rejected");
        }
        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
