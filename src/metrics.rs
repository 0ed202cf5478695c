use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gateway_query_requests_total", "Total number of query requests").unwrap();
    pub static ref AUTH_FAILURES: Counter =
        register_counter!("gateway_auth_failures_total", "Requests rejected for a bad API key").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("gateway_rate_limited_total", "Requests rejected by the rate limiter").unwrap();
    pub static ref COMPLETION_FAILURES: Counter =
        register_counter!("gateway_completion_failures_total", "Failed completion calls").unwrap();
    pub static ref SEARCH_FAILURES: Counter =
        register_counter!("gateway_search_failures_total", "Failed browser searches").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "gateway_query_latency_seconds",
        "End-to-end query latency in seconds"
    )
    .unwrap();
    pub static ref TRACKED_CREDENTIALS: Gauge =
        register_gauge!("gateway_tracked_credentials", "Credentials with a live rate window").unwrap();
}
