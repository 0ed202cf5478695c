use std::sync::Arc;
use crate::auth::Authenticator;
use crate::completion::CompletionClient;
use crate::rate_limit::SlidingWindowLimiter;
use crate::search::SearchExecutor;
// app's shared state

pub struct AppState {
    pub authenticator: Authenticator,
    pub rate_limiter: Arc<SlidingWindowLimiter>,
    pub completion: Arc<dyn CompletionClient>,
    pub search: SearchExecutor,
}
