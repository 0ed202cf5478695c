use axum::{Extension, Json, extract::State};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::Credential;
use crate::error::AppError;
use crate::metrics::{COMPLETION_FAILURES, REQUEST_LATENCY, SEARCH_FAILURES};
use crate::models::{QueryRequest, QueryResponse};
use crate::state::AppState;

/// Prompt -> completion -> site search. Authentication and rate limiting have
/// already run in the route layer. Any failure aborts the whole request: no
/// partial payload is returned.
#[tracing::instrument(name = "query", skip_all, fields(key = %credential.fingerprint()))]
pub async fn query_handler(
    State(state): State<Arc<AppState>>,
    Extension(credential): Extension<Credential>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    let start_time = Instant::now();
    let result = run_query(&state, payload).await;
    // observed on every exit, failures included
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    result.map(Json)
}

async fn run_query(state: &AppState, payload: QueryRequest) -> Result<QueryResponse, AppError> {
    let target = payload.target_url()?;
    tracing::info!(url = %target, "query accepted");

    let generated_text = state
        .completion
        .complete(&payload.user_input)
        .await
        .inspect_err(|_| COMPLETION_FAILURES.inc())?;
    tracing::info!(model = state.completion.model_name(), "completion done");

    let search_results = state
        .search
        .execute(target.as_str(), &generated_text)
        .await
        .inspect_err(|_| SEARCH_FAILURES.inc())?;
    tracing::info!(results = search_results.len(), "search done");

    Ok(QueryResponse {
        generated_text,
        search_results,
    })
}
