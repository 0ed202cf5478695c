mod health;
mod metrics;
mod query;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::auth::require_api_key;
use crate::state::AppState;

pub use health::health_handler;
pub use metrics::metrics_handler;
pub use query::query_handler;

// /query sits behind the API key + rate limit layer, ops routes do not
pub fn router(state: Arc<AppState>) -> Router {
    let query = Router::new()
        .route("/query", post(query_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(query)
        .with_state(state)
}
