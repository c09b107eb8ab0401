use crate::config::ConfigError;
use scraper::{ElementRef, Html, Selector};

/// Parsed view of a rendered page, addressable by CSS selectors.
///
/// Built from the page source once the session that produced it is gone, and
/// dropped at the end of the iteration that asked for it.
pub struct RenderedDocument {
    html: Html,
}

impl RenderedDocument {
    /// Parses a full page source
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    /// All elements matching `selector`, in document order
    pub fn select<'a>(
        &'a self,
        selector: &'a Selector,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.html.select(selector)
    }

    /// Whitespace-normalized text of the first element matching `selector`
    pub fn select_text(&self, selector: &Selector) -> Option<String> {
        self.html.select(selector).next().map(inner_text)
    }
}

/// Text content of an element with runs of whitespace collapsed to one space
pub fn inner_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compiles a configured selector, naming the config field on failure
pub fn parse_selector(field: &'static str, css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| ConfigError::Selector {
        field,
        selector: css.to_string(),
        reason: format!("{:?}", e),
    })
}
