mod auth;
mod browser;
mod completion;
mod config;
mod error;
mod handlers;
mod metrics;
mod models;
mod rate_limit;
mod search;
mod state;
mod telemetry;

use anyhow::Context;
use clap::Parser; // for cli
use std::sync::Arc;

use crate::auth::Authenticator;
use crate::browser::WebDriverLauncher;
use crate::completion::OpenAiCompletionClient;
use crate::config::Args;
use crate::rate_limit::SlidingWindowLimiter;
use crate::search::SearchExecutor;
use crate::state::AppState;

// this is main async function with tokio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // parse cli arguments
    let args = Args::parse();
    telemetry::init_tracing(args.log_format, "info")?;

    args.validate()?;
    let secrets = args.secrets()?;
    if secrets.insecure {
        tracing::warn!("running with placeholder secrets, do not expose this instance");
    }

    let rate_limiter = Arc::new(SlidingWindowLimiter::new(args.rate_limit, args.rate_window()));
    let sweeper = rate_limiter.spawn_sweeper(args.sweep_interval());

    let completion = OpenAiCompletionClient::new(
        &args.openai_base_url,
        secrets.openai_api_key,
        args.model.clone(),
        args.max_tokens,
        args.completion_timeout(),
    )
    .context("failed to build completion client")?;

    let search = SearchExecutor::new(
        Arc::new(WebDriverLauncher::new(args.webdriver_url.clone())),
        args.max_browser_sessions,
        args.search_timeout(),
    );

    // creating shared state
    let state = Arc::new(AppState {
        authenticator: Authenticator::new(&secrets.api_key),
        rate_limiter,
        completion: Arc::new(completion),
        search,
    });

    let app = handlers::router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "gateway listening");
    tracing::info!(model = %args.model, upstream = %args.openai_base_url, "completion backend");
    tracing::info!(webdriver = %args.webdriver_url, sessions = args.max_browser_sessions, "browser backend");
    tracing::info!(
        "Rate limit: {} requests per {} seconds",
        args.rate_limit, args.rate_window
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // rate limiter teardown
    sweeper.abort();
    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
