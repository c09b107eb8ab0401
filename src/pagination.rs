use crate::error::{CrawlError, Result};
use url::Url;

/// Results per listing page
pub const PAGE_SIZE: usize = 20;

/// Query parameter carrying the result offset
const OFFSET_PARAM: &str = "i";

/// Position of the crawl within the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    /// 1-based page index
    pub page_index: usize,
    /// 1-based index of the first result shown on the page
    pub result_offset: usize,
    pub total_pages: usize,
}

impl PageState {
    pub fn new(page_index: usize, total_pages: usize) -> Self {
        Self {
            page_index,
            result_offset: offset_for_page(page_index),
            total_pages,
        }
    }
}

/// Offset of the first result on `page_index`: `20 * (page_index - 1) + 1`.
pub fn offset_for_page(page_index: usize) -> usize {
    PAGE_SIZE * page_index.saturating_sub(1) + 1
}

/// Reads Y out of a "Página X de Y" counter.
///
/// The counter must have at least four whitespace-separated tokens, with the
/// second and fourth both integers.
pub fn parse_total_pages(text: &str) -> Result<usize> {
    let malformed = || CrawlError::MalformedPageCounter {
        text: text.to_string(),
    };

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < 4 {
        return Err(malformed());
    }

    words[1].parse::<usize>().map_err(|_| malformed())?;
    let total = words[3].parse::<usize>().map_err(|_| malformed())?;

    Ok(total)
}

/// Listing URL for `page_index`, with the offset parameter replaced (or appended).
pub fn page_url(list_url: &Url, page_index: usize) -> Url {
    let offset = offset_for_page(page_index).to_string();

    let mut replaced = false;
    let pairs: Vec<(String, String)> = list_url
        .query_pairs()
        .map(|(key, value)| {
            if key == OFFSET_PARAM {
                replaced = true;
                (key.into_owned(), offset.clone())
            } else {
                (key.into_owned(), value.into_owned())
            }
        })
        .collect();

    let mut url = list_url.clone();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        query.extend_pairs(pairs.iter());
        if !replaced {
            query.append_pair(OFFSET_PARAM, &offset);
        }
    }
    url
}
