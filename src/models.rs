use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;

// POST /query request body
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct QueryRequest {
    pub user_input: String,
    pub search_url: String,
}

// POST /query response body
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct QueryResponse {
    pub generated_text: String,
    pub search_results: Vec<String>,
}

impl QueryRequest {
    // Only absolute http(s) targets are handed to the browser
    pub fn target_url(&self) -> Result<Url, AppError> {
        let url = Url::parse(self.search_url.trim())
            .map_err(|e| AppError::InvalidRequest(format!("search_url is not a valid URL: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AppError::InvalidRequest(format!(
                "search_url scheme {other:?} is not supported"
            ))),
        }
    }
}
