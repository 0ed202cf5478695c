use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::key::Key;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::time::{Duration, Instant};

use crate::search::{BrowserLauncher, BrowserSession, SearchError};

// How long to wait for the post-submit navigation before scraping anyway
const NAVIGATION_SETTLE: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(200);

// Submits the form enclosing arguments[0] the way a user-initiated submit
// does: walk up from the typed field itself, fire a cancelable `submit` event
// so page handlers run, and only fall through to the native submit when no
// handler cancelled it.
const SUBMIT_ENCLOSING_FORM: &str = r#"
var node = arguments[0];
while (node && !(node.nodeName && node.nodeName.toUpperCase() === 'FORM')) {
    node = node.parentNode;
}
if (!node) { return 'no-form'; }
var event = new Event('submit', { bubbles: true, cancelable: true });
if (!node.dispatchEvent(event)) { return 'cancelled'; }
HTMLFormElement.prototype.submit.call(node);
return 'submitted';
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmitOutcome {
    Submitted,
    // a submit listener called preventDefault and ran the search itself
    HandledByPage,
    NoForm,
}

impl SubmitOutcome {
    fn from_script(value: &serde_json::Value) -> Result<Self, SearchError> {
        match value.as_str() {
            Some("submitted") => Ok(SubmitOutcome::Submitted),
            Some("cancelled") => Ok(SubmitOutcome::HandledByPage),
            Some("no-form") => Ok(SubmitOutcome::NoForm),
            _ => Err(SearchError::Driver(format!("unexpected submit result: {value}"))),
        }
    }
}

/// Starts headless Chrome sessions through a running WebDriver service.
pub struct WebDriverLauncher {
    webdriver_url: String,
}

impl WebDriverLauncher {
    pub fn new(webdriver_url: impl Into<String>) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
        }
    }

    fn capabilities() -> serde_json::Map<String, serde_json::Value> {
        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": [
                    "--headless=new",
                    "--disable-gpu",
                    "--no-sandbox",
                    "--disable-dev-shm-usage",
                ]
            }),
        );
        caps
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, SearchError> {
        let client = ClientBuilder::native()
            .capabilities(Self::capabilities())
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| SearchError::Launch(e.to_string()))?;

        tracing::debug!(webdriver = %self.webdriver_url, "browser session started");
        Ok(Box::new(WebDriverSession { client }))
    }
}

pub struct WebDriverSession {
    client: Client,
}

fn driver_err(e: CmdError) -> SearchError {
    SearchError::Driver(e.to_string())
}

impl WebDriverSession {
    // Wait until the URL moves off `before`, then for a body on the new page
    async fn settle_after_submit(&self, before: &str) -> Result<(), SearchError> {
        let deadline = Instant::now() + NAVIGATION_SETTLE;
        loop {
            let current = self.client.current_url().await.map_err(driver_err)?;
            if current.as_str() != before {
                break;
            }
            if Instant::now() >= deadline {
                tracing::debug!(url = %before, "url unchanged after submit, scraping in place");
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        self.client
            .wait()
            .at_most(NAVIGATION_SETTLE)
            .for_element(Locator::Css("body"))
            .await
            .map_err(|e| SearchError::Navigation(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), SearchError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| SearchError::Navigation(e.to_string()))
    }

    async fn submit_query(&mut self, field_name: &str, text: &str) -> Result<(), SearchError> {
        let selector = format!("[name=\"{}\"]", field_name);
        let field = match self.client.find(Locator::Css(&selector)).await {
            Ok(el) => el,
            Err(e) if e.is_no_such_element() => {
                return Err(SearchError::FieldNotFound(field_name.to_string()));
            }
            Err(e) => return Err(driver_err(e)),
        };

        let before = self.client.current_url().await.map_err(driver_err)?;
        field.send_keys(text).await.map_err(driver_err)?;

        let field_ref = serde_json::to_value(&field)
            .map_err(|e| SearchError::Driver(format!("cannot pass field to script: {e}")))?;
        let raw = self
            .client
            .execute(SUBMIT_ENCLOSING_FORM, vec![field_ref])
            .await
            .map_err(driver_err)?;

        match SubmitOutcome::from_script(&raw)? {
            SubmitOutcome::Submitted => {}
            SubmitOutcome::HandledByPage => tracing::debug!("submit handled by page script"),
            // field outside a form, pressing Enter is what a user would do
            SubmitOutcome::NoForm => {
                let enter = char::from(Key::Enter).to_string();
                field.send_keys(&enter).await.map_err(driver_err)?;
            }
        }

        self.settle_after_submit(before.as_str()).await
    }

    async fn extract(&mut self, selector: &str, limit: usize) -> Result<Vec<String>, SearchError> {
        let elements = self
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(driver_err)?;

        let mut texts = Vec::with_capacity(limit.min(elements.len()));
        for el in elements.into_iter().take(limit) {
            texts.push(el.text().await.map_err(driver_err)?);
        }
        Ok(texts)
    }

    async fn close(self: Box<Self>) -> Result<(), SearchError> {
        self.client.close().await.map_err(driver_err)
    }
}
