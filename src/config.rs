use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL in `{field}`: {source}")]
    Url {
        field: &'static str,
        source: url::ParseError,
    },

    #[error("invalid CSS selector in `{field}` ({selector}): {reason}")]
    Selector {
        field: &'static str,
        selector: String,
        reason: String,
    },

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// External command used to confirm the browser's native save prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGesture {
    /// Program to run
    pub program: String,

    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for HostGesture {
    /// macOS keystroke sequence: save, wait, confirm.
    fn default() -> Self {
        Self {
            program: "osascript".to_string(),
            args: vec![
                "-e".to_string(),
                concat!(
                    "tell application \"System Events\"\n",
                    "    keystroke \"s\" using {command down}\n",
                    "    delay 1\n",
                    "    keystroke return\n",
                    "end tell"
                )
                .to_string(),
            ],
        }
    }
}

/// Configuration for a crawl of the thesis index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Table-of-contents URL; its `i` query parameter is rewritten per page
    #[serde(default = "default_list_url")]
    pub list_url: String,

    /// Prefix every artifact URL starts with
    #[serde(default = "default_document_base_url")]
    pub document_base_url: String,

    /// Artifact file extension, including the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Run the browser without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Selects one result row on a listing page
    #[serde(default = "default_row_selector")]
    pub row_selector: String,

    /// Selects the document link inside a row
    #[serde(default = "default_link_selector")]
    pub link_selector: String,

    /// Selects the "Página X de Y" counter on the landing page
    #[serde(default = "default_page_counter_selector")]
    pub page_counter_selector: String,

    /// Wait after loading an artifact before triggering the export
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Wait after triggering the export before confirming the save prompt
    #[serde(default = "default_dialog_wait_ms")]
    pub dialog_wait_ms: u64,

    /// Maximum number of downloads in flight
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,

    /// Deadline for the whole crawl; partial results are returned once it passes
    #[serde(default)]
    pub total_timeout_secs: Option<u64>,

    /// Collect records only, skipping the download phase
    #[serde(default)]
    pub skip_download: bool,

    #[serde(default)]
    pub host_gesture: HostGesture,

    /// Where the CSV report is written
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

fn default_list_url() -> String {
    "https://scon.stj.jus.br/SCON/jt/toc.jsp?tipo=JT&b=TEMA&p=true&thesaurus=JURIDICO&l=20&i=1&operador=E&ordenacao=MAT,@NUM".to_string()
}

fn default_document_base_url() -> String {
    "https://www.stj.jus.br/docs_internet/jurisprudencia/jurisprudenciaemteses/Jurisprudencia%20em%20Teses%20".to_string()
}

fn default_extension() -> String {
    ".pdf".to_string()
}

/// Environment variable that replaces the built-in WebDriver URL
pub const WEBDRIVER_URL_ENV: &str = "WEBDRIVER_URL";

/// Default value for webdriver_url; `WEBDRIVER_URL` applies only here, so a
/// value from the file, the command line or the builder always wins
fn default_webdriver_url() -> String {
    webdriver_url_or_default(std::env::var(WEBDRIVER_URL_ENV).ok())
}

fn webdriver_url_or_default(from_env: Option<String>) -> String {
    from_env
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| "http://localhost:4444".to_string())
}

fn default_true() -> bool {
    true
}

fn default_row_selector() -> String {
    "#corpopaginajurisprudencia > div:nth-of-type(3) > div:nth-of-type(2) > div > div > form > table > tbody > tr".to_string()
}

fn default_link_selector() -> String {
    "td:nth-of-type(2) > span > a".to_string()
}

fn default_page_counter_selector() -> String {
    "body > div:nth-of-type(1) > section:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(3) > div:nth-of-type(2) > div > div > div:nth-of-type(2) > div > span:nth-of-type(3)".to_string()
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_dialog_wait_ms() -> u64 {
    5000
}

/// One download at a time unless asked otherwise
fn default_download_concurrency() -> usize {
    1
}

fn default_output_path() -> String {
    "Result/thesis.csv".to_string()
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            list_url: default_list_url(),
            document_base_url: default_document_base_url(),
            extension: default_extension(),
            webdriver_url: default_webdriver_url(),
            headless: true,
            row_selector: default_row_selector(),
            link_selector: default_link_selector(),
            page_counter_selector: default_page_counter_selector(),
            settle_ms: default_settle_ms(),
            dialog_wait_ms: default_dialog_wait_ms(),
            download_concurrency: default_download_concurrency(),
            total_timeout_secs: None,
            skip_download: false,
            host_gesture: HostGesture::default(),
            output_path: default_output_path(),
        }
    }
}

impl CrawlerConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Parsed listing URL
    pub fn list_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.list_url).map_err(|source| ConfigError::Url {
            field: "list_url",
            source,
        })
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn dialog_wait(&self) -> Duration {
        Duration::from_millis(self.dialog_wait_ms)
    }

    pub fn total_timeout(&self) -> Option<Duration> {
        self.total_timeout_secs.map(Duration::from_secs)
    }

    /// Check the values serde cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.list_url()?;
        Url::parse(&self.webdriver_url).map_err(|source| ConfigError::Url {
            field: "webdriver_url",
            source,
        })?;

        if self.download_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "download_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.document_base_url.is_empty() {
            return Err(ConfigError::Invalid {
                field: "document_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if self.host_gesture.program.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "host_gesture.program",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
