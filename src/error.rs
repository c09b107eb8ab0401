use crate::config::ConfigError;
use thiserror::Error;

/// Errors raised while crawling the thesis index
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The browsing capability could not hand out a session
    #[error("could not create browsing session: {reason}")]
    SessionCreateFailed { reason: String },

    /// A session could not load (or read back) the given URL
    #[error("failed to load {url}: {reason}")]
    NavigationFailed { url: String, reason: String },

    /// The "Página X de Y" counter did not have the expected layout
    #[error("page counter has an unexpected format: {text:?}")]
    MalformedPageCounter { text: String },

    /// A row carried a link but no `EDIÇÃO N.` heading. Dropped, never surfaced.
    #[error("row has no edition marker: {text:?}")]
    ExtractionMismatch { text: String },

    #[error("export action failed for {url}: {reason}")]
    ExportTriggerFailed { url: String, reason: String },

    #[error("host gesture failed: {reason}")]
    HostGestureFailed { reason: String },

    #[error("could not close browsing session: {reason}")]
    SessionCloseFailed { reason: String },

    /// Traversal failure, tagged with the page it happened on
    #[error("crawl aborted on page {page}: {source}")]
    Page {
        page: usize,
        source: Box<CrawlError>,
    },

    #[error("crawl cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CrawlError {
    /// Attach the page index to a traversal error. Cancellation passes through untouched.
    pub fn on_page(self, page: usize) -> Self {
        match self {
            CrawlError::Cancelled => CrawlError::Cancelled,
            other => CrawlError::Page {
                page,
                source: Box::new(other),
            },
        }
    }
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;
