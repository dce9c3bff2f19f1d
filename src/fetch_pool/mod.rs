//! Stealth Fetch Pool: a fixed set of headless browser sessions serving
//! `fetch(url, selector)` requests.

pub mod error;
mod extract;
mod postprocess;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::browser_pool::{BrowserPool, BrowserPoolConfig};
pub use error::FetchError;
pub use extract::Links;
pub use postprocess::{contains_not_found_phrase, post_process};

/// Result of a single fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub text: String,
    pub links: Links,
    pub not_found: bool,
}

/// Tunables for the fetch pool, sourced from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct FetchPoolConfig {
    pub pool_size: usize,
    pub headless: bool,
    pub delay_before_return: Duration,
    pub page_timeout: Duration,
    pub max_retries: u32,
}

/// Fixed-size pool of stealth browser sessions.
pub struct FetchPool {
    browsers: Arc<BrowserPool>,
    config: FetchPoolConfig,
}

impl FetchPool {
    /// Build and pre-warm the pool. Must be called once at startup.
    pub async fn start(config: FetchPoolConfig) -> anyhow::Result<Self> {
        let browsers = BrowserPool::new(BrowserPoolConfig {
            pool_size: config.pool_size,
            headless: config.headless,
            ..BrowserPoolConfig::default()
        });
        browsers.start().await?;
        Ok(Self { browsers, config })
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.browsers.shutdown().await
    }

    /// Fetch `url`, optionally restricting extraction to `selector`.
    ///
    /// Permanent session errors evict and relaunch the session, then retry
    /// on a fresh one. Transient errors retry the same request against a
    /// (possibly different) pooled session. Bounded at `max_retries` beyond
    /// the first attempt.
    pub async fn fetch(&self, url: &str, selector: Option<&str>) -> Result<FetchResult, FetchError> {
        let mut last_err = FetchError::Transient("not attempted".to_string());

        for attempt in 0..=self.config.max_retries {
            match self.try_fetch_once(url, selector).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if err.is_permanent() {
                        warn!(url, attempt, "permanent fetch error, session evicted: {err}");
                    } else {
                        debug!(url, attempt, "transient fetch error, retrying: {err}");
                    }
                    last_err = err;
                }
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts: self.config.max_retries + 1,
            last: last_err.to_string(),
        })
    }

    async fn try_fetch_once(&self, url: &str, selector: Option<&str>) -> Result<FetchResult, FetchError> {
        let guard = self
            .browsers
            .acquire()
            .await
            .map_err(|e| FetchError::classify(&e.to_string()))?;

        let browser = guard.browser();
        let nav = async {
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| e.to_string())?;
            page.goto(url).await.map_err(|e| e.to_string())?;
            page.wait_for_navigation()
                .await
                .map_err(|e| e.to_string())?;

            tokio::time::sleep(self.config.delay_before_return).await;

            let html = page.content().await.map_err(|e| e.to_string())?;
            let _ = page.close().await;
            Ok::<String, String>(html)
        };

        let html = match tokio::time::timeout(self.config.page_timeout, nav).await {
            Ok(Ok(html)) => html,
            Ok(Err(msg)) => {
                let err = FetchError::classify(&msg);
                if err.is_permanent() {
                    self.browsers.evict_and_replace(guard.take_for_eviction()).await;
                }
                return Err(err);
            }
            Err(_) => {
                // Navigation timeout is always transient.
                return Err(FetchError::Transient(format!(
                    "navigation timeout after {:?}",
                    self.config.page_timeout
                )));
            }
        };

        let not_found = contains_not_found_phrase(&html);
        let (raw_text, links) = extract::extract(&html, url, selector);
        let text = post_process(&raw_text);

        Ok(FetchResult { text, links, not_found })
    }
}
