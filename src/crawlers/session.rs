//! Session lifecycle for the browsing capability.
//!
//! Every unit of work (one listing page, one download) opens its own session
//! and releases it before returning. Sessions are never reused across pages
//! or shared between concurrent tasks: the target site misbehaves when one
//! long-lived session navigates many times.

use crate::config::HostGesture;
use crate::error::{CrawlError, Result};
use crate::parsers::RenderedDocument;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A live connection to the rendering capability, able to show one URL at a time
#[async_trait]
pub trait Session: Send {
    /// Load `url` in this session
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Source of the currently loaded page
    async fn source(&mut self) -> Result<String>;

    /// Fire the browser's native "export current view" action
    async fn trigger_export(&mut self) -> Result<()>;

    /// Run an OS-level gesture against the browser window
    async fn execute_host_gesture(&mut self, gesture: &HostGesture) -> Result<()>;

    /// Release the session
    async fn close(&mut self) -> Result<()>;
}

/// Hands out fresh sessions
#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Session>>;
}

/// Races `operation` against `cancel`
async fn cancellable<T>(
    cancel: &CancellationToken,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CrawlError::Cancelled),
        result = operation => result,
    }
}

/// Sleeps for `duration` unless cancelled first
pub async fn settle(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    if duration.is_zero() {
        return Ok(());
    }
    cancellable(cancel, async {
        tokio::time::sleep(duration).await;
        Ok(())
    })
    .await
}

/// A session opened at a URL and released exactly once.
///
/// Prefer [`SessionGuard::release`]. If the guard is dropped without it
/// (panic, early return) the close is scheduled on the current runtime.
pub struct SessionGuard {
    session: Option<Box<dyn Session>>,
    url: String,
    cancel: CancellationToken,
}

impl SessionGuard {
    /// Opens a session and navigates it to `url`.
    ///
    /// A failed navigation releases the session before the error is returned.
    pub async fn open(
        browser: &dyn Browser,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let session = cancellable(cancel, browser.open()).await?;
        ::log::trace!("Opened session for {}", url);

        let mut guard = Self {
            session: Some(session),
            url: url.to_string(),
            cancel: cancel.clone(),
        };

        let navigation = match guard.session.as_mut() {
            Some(session) => cancellable(cancel, session.navigate(url)).await,
            None => Err(Self::released(url)),
        };
        if let Err(e) = navigation {
            guard.release().await;
            return Err(e);
        }

        Ok(guard)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn source(&mut self) -> Result<String> {
        let (session, cancel) = self.active()?;
        cancellable(cancel, session.source()).await
    }

    pub async fn trigger_export(&mut self) -> Result<()> {
        let (session, cancel) = self.active()?;
        cancellable(cancel, session.trigger_export()).await
    }

    pub async fn execute_host_gesture(&mut self, gesture: &HostGesture) -> Result<()> {
        let (session, cancel) = self.active()?;
        cancellable(cancel, session.execute_host_gesture(gesture)).await
    }

    /// Closes the session. Close failures are logged, not returned.
    pub async fn release(mut self) {
        if let Some(mut session) = self.session.take() {
            match session.close().await {
                Ok(()) => ::log::trace!("Released session for {}", self.url),
                Err(e) => ::log::warn!("Failed to close session for {}: {}", self.url, e),
            }
        }
    }

    fn active(&mut self) -> Result<(&mut Box<dyn Session>, &CancellationToken)> {
        match self.session.as_mut() {
            Some(session) => Ok((session, &self.cancel)),
            None => Err(Self::released(&self.url)),
        }
    }

    fn released(url: &str) -> CrawlError {
        CrawlError::SessionCreateFailed {
            reason: format!("session for {} was already released", url),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        let url = std::mem::take(&mut self.url);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        ::log::warn!("Deferred close failed for {}: {}", url, e);
                    }
                });
            }
            Err(_) => ::log::warn!("No runtime to close session for {}", url),
        }
    }
}

/// Opens a session at `url`, renders it, releases the session, then hands
/// the document to `f`.
///
/// The session is released on every path. Fails with `SessionCreateFailed`
/// when no session can be opened and `NavigationFailed` when the page cannot
/// be loaded.
pub async fn with_session<T, F>(
    browser: &dyn Browser,
    url: &str,
    cancel: &CancellationToken,
    f: F,
) -> Result<T>
where
    F: FnOnce(&RenderedDocument) -> T,
{
    let mut guard = SessionGuard::open(browser, url, cancel).await?;
    let source = guard.source().await;
    guard.release().await;

    let document = RenderedDocument::parse(&source?);
    Ok(f(&document))
}
