use crate::config::CrawlerConfig;
use crate::crawlers::download::{self, DownloadOptions};
use crate::crawlers::session::{self, Browser};
use crate::error::{CrawlError, Result};
use crate::pagination::{self, PageState};
use crate::parsers::html;
use crate::parsers::record::RecordExtractor;
use crate::results::Record;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Records collected by a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    pub records: Vec<Record>,
    /// True when the crawl stopped early on cancellation or deadline;
    /// `records` then holds whatever was collected up to that point.
    pub cancelled: bool,
}

/// Crawls every listing page, then downloads each discovered document.
///
/// 1. The landing page is fetched once to discover the page count.
/// 2. Pages `1..=total` are fetched in order, each on a fresh session.
/// 3. Unless `skip_download` is set, every record goes through the download phase.
///
/// A failure while discovering or fetching a page aborts the crawl with the
/// page index attached. Download failures only mark their own record.
pub async fn crawl(
    browser: Arc<dyn Browser>,
    config: &CrawlerConfig,
    cancel: CancellationToken,
) -> Result<CrawlOutcome> {
    config.validate()?;

    let list_url = config.list_url()?;
    let extractor = RecordExtractor::from_config(config)?;
    let counter_selector =
        html::parse_selector("page_counter_selector", &config.page_counter_selector)?;

    let cancel = cancel.child_token();
    let _deadline = config
        .total_timeout()
        .map(|timeout| arm_deadline(timeout, cancel.clone()));

    let mut outcome = CrawlOutcome::default();

    // Landing page
    let landing_url = pagination::page_url(&list_url, 1);
    ::log::info!("Discovering page count from {}", landing_url);
    let total_pages = match session::with_session(
        browser.as_ref(),
        landing_url.as_str(),
        &cancel,
        |doc| {
            let text = doc.select_text(&counter_selector).unwrap_or_default();
            pagination::parse_total_pages(&text)
        },
    )
    .await
    .and_then(|parsed| parsed)
    {
        Ok(total) => total,
        Err(CrawlError::Cancelled) => {
            ::log::warn!("Crawl cancelled before the page count was known");
            outcome.cancelled = true;
            return Ok(outcome);
        }
        Err(e) => return Err(e.on_page(1)),
    };
    ::log::info!("Index has {} pages", total_pages);

    for page_index in 1..=total_pages {
        if cancel.is_cancelled() {
            outcome.cancelled = true;
            break;
        }

        let state = PageState::new(page_index, total_pages);
        let url = pagination::page_url(&list_url, state.page_index);
        ::log::debug!(
            "Fetching page {}/{} (offset {}): {}",
            state.page_index,
            state.total_pages,
            state.result_offset,
            url
        );

        match session::with_session(browser.as_ref(), url.as_str(), &cancel, |doc| {
            extractor.extract(doc)
        })
        .await
        {
            Ok(records) => {
                ::log::info!(
                    "Page {}/{}: {} records",
                    state.page_index,
                    state.total_pages,
                    records.len()
                );
                outcome.records.extend(records);
            }
            Err(CrawlError::Cancelled) => {
                outcome.cancelled = true;
                break;
            }
            Err(e) => return Err(e.on_page(page_index)),
        }
    }

    if outcome.cancelled {
        ::log::warn!(
            "Crawl cancelled during traversal with {} records collected",
            outcome.records.len()
        );
        return Ok(outcome);
    }

    if config.skip_download {
        ::log::info!("Skipping downloads for {} records", outcome.records.len());
        return Ok(outcome);
    }

    ::log::info!("Downloading {} documents", outcome.records.len());
    let options = DownloadOptions::from_config(config);
    outcome.cancelled =
        download::download_all(browser, &mut outcome.records, &options, &cancel).await;

    Ok(outcome)
}

/// Cancels `cancel` once `timeout` elapses. The timer stops when the returned
/// guard is dropped.
fn arm_deadline(
    timeout: Duration,
    cancel: CancellationToken,
) -> tokio_util::sync::DropGuard {
    let timer = cancel.child_token();
    let stop = timer.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = stop.cancelled() => {}
            _ = tokio::time::sleep(timeout) => {
                ::log::warn!("Crawl deadline of {:?} reached, cancelling", timeout);
                cancel.cancel();
            }
        }
    });

    timer.drop_guard()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostGesture;
    use crate::test_utils::FakeBrowser;
    use url::Url;

    const LIST_URL: &str = "https://site.test/toc.jsp?tipo=JT&l=20&i=1";
    const BASE: &str = "https://docs.test/Teses%20";

    fn config() -> CrawlerConfig {
        CrawlerConfig {
            list_url: LIST_URL.to_string(),
            document_base_url: BASE.to_string(),
            row_selector: "table.results tr".to_string(),
            link_selector: "td:nth-of-type(2) a".to_string(),
            page_counter_selector: "span.counter".to_string(),
            settle_ms: 0,
            dialog_wait_ms: 0,
            host_gesture: HostGesture {
                program: "true".to_string(),
                args: Vec::new(),
            },
            ..CrawlerConfig::default()
        }
    }

    fn page_url(page: usize) -> String {
        pagination::page_url(&Url::parse(LIST_URL).unwrap(), page).to_string()
    }

    fn listing(counter: &str, rows: &[&str]) -> String {
        let rows: String = rows
            .iter()
            .enumerate()
            .map(|(i, text)| {
                format!(
                    "<tr><td>{}</td><td><span><a href=\"#\">{}</a></span></td></tr>",
                    i + 1,
                    text
                )
            })
            .collect();
        format!(
            "<html><body><span class=\"counter\">{}</span><table class=\"results\">{}</table></body></html>",
            counter, rows
        )
    }

    fn two_page_site() -> FakeBrowser {
        FakeBrowser::new()
            .with_page(
                &page_url(1),
                &listing(
                    "Página 1 de 2",
                    &["EDIÇÃO N. 12: Responsabilidade Civil do Estado", "Sumário"],
                ),
            )
            .with_page(
                &page_url(2),
                &listing("Página 2 de 2", &["EDIÇÃO N. 13: direito penal - iv"]),
            )
    }

    #[tokio::test]
    async fn test_two_page_crawl() {
        let fake = two_page_site().with_failing_export(&format!(
            "{}13%20-%20Direito%20Penal%20-%20IV.pdf",
            BASE
        ));
        let browser: Arc<dyn Browser> = Arc::new(fake.clone());

        let outcome = crawl(browser, &config(), CancellationToken::new())
            .await
            .unwrap();

        assert!(!outcome.cancelled);
        assert_eq!(
            outcome.records,
            vec![
                Record {
                    file_name: "Responsabilidade Civil do Estado".to_string(),
                    source_url: format!(
                        "{}12%20-%20Responsabilidade%20Civil%20do%20Estado.pdf",
                        BASE
                    ),
                    downloaded: true,
                },
                Record {
                    file_name: "direito penal - iv".to_string(),
                    source_url: format!("{}13%20-%20Direito%20Penal%20-%20IV.pdf", BASE),
                    downloaded: false,
                },
            ]
        );

        // landing, page 1, page 2, then one session per download
        assert_eq!(
            fake.navigations(),
            vec![
                page_url(1),
                page_url(1),
                page_url(2),
                outcome.records[0].source_url.clone(),
                outcome.records[1].source_url.clone(),
            ]
        );
        assert_eq!(fake.opened(), 5);
        assert_eq!(fake.closed(), 5);
        assert_eq!(fake.max_live(), 1);
    }

    #[tokio::test]
    async fn test_skip_download_leaves_flags_unset() {
        let fake = two_page_site();
        let browser: Arc<dyn Browser> = Arc::new(fake.clone());
        let config = CrawlerConfig {
            skip_download: true,
            ..config()
        };

        let outcome = crawl(browser, &config, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.records.iter().all(|r| !r.downloaded));
        assert_eq!(fake.opened(), 3);
        assert!(fake.exports().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_counter_aborts_on_page_one() {
        let fake = FakeBrowser::new().with_page(&page_url(1), &listing("Página", &[]));
        let browser: Arc<dyn Browser> = Arc::new(fake.clone());

        let err = crawl(browser, &config(), CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            CrawlError::Page { page, source } => {
                assert_eq!(page, 1);
                assert!(matches!(*source, CrawlError::MalformedPageCounter { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(fake.closed(), fake.opened());
    }

    #[tokio::test]
    async fn test_page_failure_is_fatal_and_names_the_page() {
        let fake = two_page_site().with_unreachable(&page_url(2));
        let browser: Arc<dyn Browser> = Arc::new(fake.clone());

        let err = crawl(browser, &config(), CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            CrawlError::Page { page, source } => {
                assert_eq!(page, 2);
                assert!(matches!(*source, CrawlError::NavigationFailed { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(fake.exports().is_empty());
        assert_eq!(fake.closed(), fake.opened());
    }

    #[tokio::test]
    async fn test_session_create_failure_is_fatal() {
        let browser: Arc<dyn Browser> = Arc::new(FakeBrowser::new().failing_open());

        let err = crawl(browser, &config(), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CrawlError::Page { page: 1, ref source }
                if matches!(**source, CrawlError::SessionCreateFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancellation_returns_partial_records() {
        let cancel = CancellationToken::new();
        // landing and page 1 complete; the third session trips the token
        let fake = two_page_site().cancel_after_opens(3, cancel.clone());
        let browser: Arc<dyn Browser> = Arc::new(fake.clone());

        let outcome = crawl(browser, &config(), cancel).await.unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(
            outcome.records[0].file_name,
            "Responsabilidade Civil do Estado"
        );
        assert!(!outcome.records[0].downloaded);
        assert!(fake.exports().is_empty());
        assert_eq!(fake.closed(), fake.opened());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_browsing() {
        let fake = two_page_site();
        let browser: Arc<dyn Browser> = Arc::new(fake.clone());
        let config = CrawlerConfig {
            row_selector: "tr[".to_string(),
            ..config()
        };

        let err = crawl(browser, &config, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::Config(_)));
        assert_eq!(fake.opened(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_crawl() {
        let cancel = CancellationToken::new();
        let _guard = arm_deadline(Duration::from_secs(5), cancel.clone());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_deadline_guard_stops_timer() {
        let cancel = CancellationToken::new();
        drop(arm_deadline(Duration::from_secs(5), cancel.clone()));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!cancel.is_cancelled());
    }
}
