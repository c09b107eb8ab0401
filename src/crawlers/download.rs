use crate::config::{CrawlerConfig, HostGesture};
use crate::crawlers::session::{self, Browser, SessionGuard};
use crate::error::{CrawlError, Result};
use crate::results::Record;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Timing and fan-out of the download phase
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Wait after the artifact loads, before the export is triggered
    pub settle: Duration,
    /// Wait for the save prompt to appear before confirming it
    pub dialog_wait: Duration,
    /// Maximum downloads in flight, each on its own session
    pub concurrency: usize,
    pub host_gesture: HostGesture,
    /// Held from the export trigger until the gesture returns. The gesture
    /// hits whichever prompt has focus, so only one prompt may be open.
    pub host_lock: Arc<Mutex<()>>,
}

impl DownloadOptions {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            settle: config.settle(),
            dialog_wait: config.dialog_wait(),
            concurrency: config.download_concurrency,
            host_gesture: config.host_gesture.clone(),
            host_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Runs the export sequence for one artifact on a dedicated session.
///
/// Loading and settling run in parallel with other downloads; the export,
/// the prompt wait and the gesture run under `options.host_lock`.
pub async fn download(
    browser: &dyn Browser,
    url: &str,
    options: &DownloadOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut guard = SessionGuard::open(browser, url, cancel).await?;
    if let Err(e) = session::settle(options.settle, cancel).await {
        guard.release().await;
        return Err(e);
    }

    let host = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CrawlError::Cancelled),
        host = options.host_lock.lock() => Ok(host),
    };
    let _host = match host {
        Ok(host) => host,
        Err(e) => {
            guard.release().await;
            return Err(e);
        }
    };

    let outcome = export_sequence(&mut guard, options, cancel).await;
    // A prompt left open by a failed gesture only goes away with its session
    guard.release().await;
    outcome
}

async fn export_sequence(
    guard: &mut SessionGuard,
    options: &DownloadOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    guard.trigger_export().await?;
    session::settle(options.dialog_wait, cancel).await?;
    guard.execute_host_gesture(&options.host_gesture).await
}

/// Downloads every record, setting `downloaded` from each attempt's outcome.
///
/// A failed download only affects its own record. Records not attempted
/// because of cancellation keep `downloaded == false`. Returns whether the
/// phase was cut short by `cancel`.
pub async fn download_all(
    browser: Arc<dyn Browser>,
    records: &mut [Record],
    options: &DownloadOptions,
    cancel: &CancellationToken,
) -> bool {
    let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let options = Arc::new(options.clone());
    let mut tasks = JoinSet::new();

    for (index, record) in records.iter().enumerate() {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let browser = Arc::clone(&browser);
        let options = Arc::clone(&options);
        let cancel = cancel.clone();
        let url = record.source_url.clone();

        tasks.spawn(async move {
            let _permit = permit;
            let outcome = download(browser.as_ref(), &url, &options, &cancel).await;
            (index, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(()))) => {
                ::log::info!("Downloaded: {}", records[index].file_name);
                records[index].downloaded = true;
            }
            Ok((index, Err(e))) => {
                ::log::warn!("Download failed for {}: {}", records[index].file_name, e);
                records[index].downloaded = false;
            }
            Err(e) => ::log::error!("Download task panicked: {}", e),
        }
    }

    cancel.is_cancelled()
}
