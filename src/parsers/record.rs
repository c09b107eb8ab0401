use crate::config::{ConfigError, CrawlerConfig};
use crate::error::{CrawlError, Result};
use crate::parsers::html::{self, RenderedDocument};
use crate::parsers::text;
use crate::results::Record;
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

static EDITION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"EDIÇÃO N\. (\d+): (.+)").expect("edition pattern is a valid regex")
});

/// Splits "EDIÇÃO N. {edition}: {title}" into its edition and title.
///
/// Text without the marker yields two empty strings.
pub fn extract_edition_and_title(text: &str) -> (String, String) {
    match EDITION_PATTERN.captures(text) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => (String::new(), String::new()),
    }
}

/// `base_url + edition + "%20-%20" + normalized title + extension`
pub fn build_source_url(base_url: &str, edition: &str, title: &str, extension: &str) -> String {
    format!(
        "{}{}%20-%20{}{}",
        base_url,
        edition,
        text::normalize_title(title),
        extension
    )
}

/// Turns listing rows into records
pub struct RecordExtractor {
    row_selector: Selector,
    link_selector: Selector,
    document_base_url: String,
    extension: String,
}

impl RecordExtractor {
    pub fn new(
        row_selector: Selector,
        link_selector: Selector,
        document_base_url: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            row_selector,
            link_selector,
            document_base_url: document_base_url.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(
            html::parse_selector("row_selector", &config.row_selector)?,
            html::parse_selector("link_selector", &config.link_selector)?,
            config.document_base_url.clone(),
            config.extension.clone(),
        ))
    }

    /// Builds a record from a row's link text
    pub fn parse_link_text(&self, link_text: &str) -> Result<Record> {
        let (edition, title) = extract_edition_and_title(link_text);
        let file_name = text::trim(&title);
        if edition.is_empty() || file_name.is_empty() {
            return Err(CrawlError::ExtractionMismatch {
                text: link_text.to_string(),
            });
        }

        let source_url =
            build_source_url(&self.document_base_url, &edition, file_name, &self.extension);
        Ok(Record::new(file_name.to_string(), source_url))
    }

    /// All records on a listing page. Rows without a link are not data rows;
    /// rows whose link lacks an edition marker are dropped.
    pub fn extract(&self, document: &RenderedDocument) -> Vec<Record> {
        let mut records = Vec::new();

        for row in document.select(&self.row_selector) {
            let Some(link) = row.select(&self.link_selector).next() else {
                continue;
            };

            match self.parse_link_text(&html::inner_text(link)) {
                Ok(record) => records.push(record),
                Err(e) => ::log::debug!("Dropping row: {}", e),
            }
        }

        records
    }
}
