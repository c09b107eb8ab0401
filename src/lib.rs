// Re-export modules
pub mod config;
pub mod crawlers;
pub mod error;
pub mod output;
pub mod pagination;
pub mod parsers;
pub mod results;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types for convenience
pub use config::{ConfigError, CrawlerConfig};
pub use crawlers::{Browser, CrawlOutcome, WebDriverBrowser};
pub use error::{CrawlError, Result};
pub use results::Record;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Builder for a crawl of the thesis index
pub struct Crawl {
    config: CrawlerConfig,
    cancel: CancellationToken,
}

impl Crawl {
    /// Create a new builder from a configuration
    pub fn new(config: CrawlerConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_config_file(
        path: impl AsRef<std::path::Path>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(CrawlerConfig::from_file(path)?))
    }

    /// Set the maximum number of downloads in flight
    pub fn with_download_concurrency(mut self, download_concurrency: usize) -> Self {
        self.config.download_concurrency = download_concurrency;
        self
    }

    /// Set the total timeout (maximum runtime)
    pub fn with_total_timeout(mut self, timeout_seconds: u64) -> Self {
        self.config.total_timeout_secs = Some(timeout_seconds);
        self
    }

    /// Set the WebDriver server URL
    pub fn with_webdriver_url(mut self, webdriver_url: &str) -> Self {
        self.config.webdriver_url = webdriver_url.to_string();
        self
    }

    /// Collect records without downloading them
    pub fn skip_download(mut self, skip: bool) -> Self {
        self.config.skip_download = skip;
        self
    }

    /// Token that stops the crawl when cancelled; partial results are kept
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Configuration the crawl will run with
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// WebDriver-backed browsing capability for the configured server
    pub fn browser(&self) -> WebDriverBrowser {
        WebDriverBrowser::from_config(&self.config)
    }

    /// Run the crawl against the configured WebDriver server
    pub async fn run(self) -> Result<CrawlOutcome> {
        let browser = Arc::new(self.browser());
        self.run_with(browser).await
    }

    /// Run the crawl against any browsing capability
    pub async fn run_with(self, browser: Arc<dyn Browser>) -> Result<CrawlOutcome> {
        crawlers::crawl(browser, &self.config, self.cancel).await
    }
}
