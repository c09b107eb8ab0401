use crate::config::{CrawlerConfig, HostGesture};
use crate::crawlers::session::{Browser, Session};
use crate::error::{CrawlError, Result};
use async_trait::async_trait;
use fantoccini::wd::Capabilities;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;

/// Script that opens the browser's print/save dialog for the current view
const EXPORT_SCRIPT: &str = "window.print();";

/// Browsing capability backed by a WebDriver server (geckodriver, chromedriver, ...)
pub struct WebDriverBrowser {
    webdriver_url: String,
    capabilities: Capabilities,
}

impl WebDriverBrowser {
    /// Firefox session capabilities, optionally headless
    pub fn new(webdriver_url: &str, headless: bool) -> Self {
        let mut capabilities = Capabilities::new();
        capabilities.insert("browserName".to_string(), json!("firefox"));
        if headless {
            capabilities.insert(
                "moz:firefoxOptions".to_string(),
                json!({ "args": ["--headless"] }),
            );
        }

        Self {
            webdriver_url: webdriver_url.to_string(),
            capabilities,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(&config.webdriver_url, config.headless)
    }

    pub fn webdriver_url(&self) -> &str {
        &self.webdriver_url
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn open(&self) -> Result<Box<dyn Session>> {
        let client = ClientBuilder::native()
            .capabilities(self.capabilities.clone())
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| {
                ::log::error!(
                    "Failed to connect to WebDriver at {}: {}",
                    self.webdriver_url,
                    e
                );
                CrawlError::SessionCreateFailed {
                    reason: format!("{} ({})", e, self.webdriver_url),
                }
            })?;

        ::log::debug!("Connected to WebDriver at {}", self.webdriver_url);
        Ok(Box::new(WebDriverSession { client }))
    }
}

/// One WebDriver session
struct WebDriverSession {
    client: Client,
}

impl WebDriverSession {
    async fn current_url(&self) -> String {
        match self.client.current_url().await {
            Ok(url) => url.to_string(),
            Err(_) => "<unknown>".to_string(),
        }
    }
}

/// Converts a WebDriver command error on `url` into a navigation failure
fn navigation_error(error: fantoccini::error::CmdError, context: &str, url: &str) -> CrawlError {
    if error.to_string().contains("Unable to find session") {
        ::log::warn!("Lost session while {} {}", context, url);
    } else {
        ::log::error!("Failed {} {}: {}", context, url, error);
    }
    CrawlError::NavigationFailed {
        url: url.to_string(),
        reason: error.to_string(),
    }
}

#[async_trait]
impl Session for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .map_err(|e| navigation_error(e, "accessing", url))
    }

    async fn source(&mut self) -> Result<String> {
        match self.client.source().await {
            Ok(source) => Ok(source),
            Err(e) => {
                let url = self.current_url().await;
                Err(navigation_error(e, "getting source for", &url))
            }
        }
    }

    async fn trigger_export(&mut self) -> Result<()> {
        match self.client.execute(EXPORT_SCRIPT, Vec::new()).await {
            Ok(_) => Ok(()),
            Err(e) => Err(CrawlError::ExportTriggerFailed {
                url: self.current_url().await,
                reason: e.to_string(),
            }),
        }
    }

    async fn execute_host_gesture(&mut self, gesture: &HostGesture) -> Result<()> {
        let status = tokio::process::Command::new(&gesture.program)
            .args(&gesture.args)
            .status()
            .await
            .map_err(|e| CrawlError::HostGestureFailed {
                reason: format!("could not run {}: {}", gesture.program, e),
            })?;

        if !status.success() {
            return Err(CrawlError::HostGestureFailed {
                reason: format!("{} exited with {}", gesture.program, status),
            });
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| CrawlError::SessionCloseFailed {
                reason: e.to_string(),
            })
    }
}
