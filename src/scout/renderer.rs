//! Page rendering - turns a URL into fully script-rendered HTML.
//!
//! The launch page builds its token list client-side, so a plain GET returns
//! an empty shell. `ChromiumRenderer` drives headless Chromium and waits until
//! every ready selector is present before capturing the DOM.

use crate::scout::error::RenderError;
use crate::scout::types::ScoutConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Source of rendered page HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Return the final HTML of `url`. Any error aborts the run.
    async fn render(&self, url: &str) -> Result<String>;
}

/// Headless Chromium renderer.
pub struct ChromiumRenderer {
    ready_selectors: Vec<String>,
    timeout: Duration,
    chrome_executable: Option<PathBuf>,
}

impl ChromiumRenderer {
    pub fn new(config: &ScoutConfig) -> Self {
        Self {
            ready_selectors: config.ready_selectors.clone(),
            timeout: Duration::from_secs(config.render_timeout_seconds),
            chrome_executable: config.chrome_executable.clone(),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if let Some(path) = &self.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(RenderError::Launch)
    }

    async fn capture(&self, browser: &Browser, url: &str) -> Result<String> {
        let page = browser
            .new_page(url)
            .await
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        // One deadline covers every condition.
        let deadline = Instant::now() + self.timeout;
        for selector in &self.ready_selectors {
            wait_for_selector(&page, selector, deadline, self.timeout).await?;
            debug!(selector = %selector, "Ready condition met");
        }

        page.content()
            .await
            .context("Failed to read rendered page content")
    }
}

async fn wait_for_selector(
    page: &Page,
    selector: &str,
    deadline: Instant,
    timeout: Duration,
) -> Result<(), RenderError> {
    loop {
        if page.find_element(selector).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(RenderError::Timeout {
                selector: selector.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    #[instrument(skip(self))]
    async fn render(&self, url: &str) -> Result<String> {
        info!("Starting Chrome in headless mode...");
        let (mut browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = self.capture(&browser, url).await;

        if let Err(e) = browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        handler_task.abort();

        let html = result?;
        info!(bytes = html.len(), "Page loaded successfully with creator info");
        Ok(html)
    }
}

/// Replays HTML previously saved to disk, e.g. the `.html` dump of a verbose run.
pub struct HtmlFileRenderer {
    path: PathBuf,
}

impl HtmlFileRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PageRenderer for HtmlFileRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        debug!(url, path = %self.path.display(), "Replaying saved page");
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read saved page {}", self.path.display()))
    }
}
