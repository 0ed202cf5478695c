use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{Instant, timeout_at};

// Form field the generated query is typed into
pub const QUERY_FIELD: &str = "q";
// Result headings scraped after submit
pub const RESULT_SELECTOR: &str = "h3";
pub const RESULT_LIMIT: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("failed to start browser session: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("no form field named {0:?}")]
    FieldNotFound(String),

    #[error("browser driver error: {0}")]
    Driver(String),

    #[error("search timed out after {0:?}")]
    Timeout(Duration),

    #[error("browser pool closed")]
    PoolClosed,
}

/// One live browser session. Implementations own an OS-level resource and
/// must release it in `close`.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), SearchError>;

    // Type `text` into the field named `field_name` and submit its form
    async fn submit_query(&mut self, field_name: &str, text: &str) -> Result<(), SearchError>;

    // Visible text of the first `limit` matches, in document order
    async fn extract(&mut self, selector: &str, limit: usize) -> Result<Vec<String>, SearchError>;

    async fn close(self: Box<Self>) -> Result<(), SearchError>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, SearchError>;
}

/// Runs a site search in a scoped browser session.
pub struct SearchExecutor {
    launcher: Arc<dyn BrowserLauncher>,
    permits: Semaphore,
    timeout: Duration,
}

impl SearchExecutor {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, max_sessions: usize, timeout: Duration) -> Self {
        Self {
            launcher,
            permits: Semaphore::new(max_sessions),
            timeout,
        }
    }

    pub async fn execute(&self, url: &str, query: &str) -> Result<Vec<String>, SearchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SearchError::PoolClosed)?;

        // one deadline covers session start-up and the in-page steps
        let deadline = Instant::now() + self.timeout;

        let mut session = match timeout_at(deadline, self.launcher.launch()).await {
            Ok(launched) => launched?,
            Err(_) => return Err(SearchError::Timeout(self.timeout)),
        };

        let steps = run_search(session.as_mut(), url, query);
        let outcome = match timeout_at(deadline, steps).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout(self.timeout)),
        };

        // the session is released on every path, a close failure never hides the outcome
        if let Err(e) = session.close().await {
            tracing::warn!(error = %e, "failed to close browser session");
        }

        outcome
    }
}

async fn run_search(
    session: &mut dyn BrowserSession,
    url: &str,
    query: &str,
) -> Result<Vec<String>, SearchError> {
    session.navigate(url).await?;
    tracing::debug!(%url, "navigated");
    session.submit_query(QUERY_FIELD, query).await?;
    let results = session.extract(RESULT_SELECTOR, RESULT_LIMIT).await?;
    tracing::debug!(count = results.len(), "extracted results");
    Ok(results)
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Scripted page served by the fake browser
    #[derive(Clone, Default)]
    pub struct FakePage {
        pub has_query_field: bool,
        pub headings: Vec<String>,
        pub fail_navigation: bool,
        pub hang: bool,
    }

    #[derive(Default)]
    pub struct FakeBrowser {
        pub page: FakePage,
        pub fail_launch: bool,
        pub launched: AtomicUsize,
        pub closed: AtomicUsize,
        pub submitted: Mutex<Vec<(String, String)>>,
    }

    impl FakeBrowser {
        pub fn with_page(page: FakePage) -> Arc<Self> {
            Arc::new(Self {
                page,
                ..Default::default()
            })
        }

        pub fn launched(&self) -> usize {
            self.launched.load(Ordering::SeqCst)
        }

        pub fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }
    }

    pub struct FakeSession {
        browser: Arc<FakeBrowser>,
        navigated: bool,
    }

    #[async_trait]
    impl BrowserLauncher for Arc<FakeBrowser> {
        async fn launch(&self) -> Result<Box<dyn BrowserSession>, SearchError> {
            if self.fail_launch {
                return Err(SearchError::Launch("chromedriver not reachable".into()));
            }
            self.launched.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                browser: Arc::clone(self),
                navigated: false,
            }))
        }
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn navigate(&mut self, url: &str) -> Result<(), SearchError> {
            if self.browser.page.fail_navigation {
                return Err(SearchError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED at {url}")));
            }
            self.navigated = true;
            Ok(())
        }

        async fn submit_query(&mut self, field_name: &str, text: &str) -> Result<(), SearchError> {
            assert!(self.navigated, "submit before navigate");
            if self.browser.page.hang {
                std::future::pending::<()>().await;
            }
            if !self.browser.page.has_query_field {
                return Err(SearchError::FieldNotFound(field_name.to_string()));
            }
            self.browser
                .submitted
                .lock()
                .unwrap()
                .push((field_name.to_string(), text.to_string()));
            Ok(())
        }

        async fn extract(&mut self, _selector: &str, limit: usize) -> Result<Vec<String>, SearchError> {
            Ok(self.browser.page.headings.iter().take(limit).cloned().collect())
        }

        async fn close(self: Box<Self>) -> Result<(), SearchError> {
            self.browser.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    pub fn headings(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Result {i}")).collect()
    }
}
