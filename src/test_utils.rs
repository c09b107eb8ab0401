//! In-memory browsing capability for tests.

use crate::config::HostGesture;
use crate::crawlers::session::{Browser, Session};
use crate::error::{CrawlError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct FakeState {
    pages: HashMap<String, String>,
    unreachable: HashSet<String>,
    failing_exports: HashSet<String>,
    failing_gestures: HashSet<String>,
    fail_open: bool,
    cancel_after_opens: Option<(usize, CancellationToken)>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    open_prompts: AtomicUsize,
    max_open_prompts: AtomicUsize,
    navigations: Mutex<Vec<String>>,
    exports: Mutex<Vec<String>>,
    gestures: Mutex<Vec<(String, HostGesture)>>,
}

/// Serves fixture pages and scripts failures per URL
#[derive(Default, Clone)]
pub struct FakeBrowser {
    state: Arc<FakeState>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self) -> &mut FakeState {
        Arc::get_mut(&mut self.state).expect("configure the fake before sharing it")
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.state_mut()
            .pages
            .insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_unreachable(mut self, url: &str) -> Self {
        self.state_mut().unreachable.insert(url.to_string());
        self
    }

    pub fn with_failing_export(mut self, url: &str) -> Self {
        self.state_mut().failing_exports.insert(url.to_string());
        self
    }

    pub fn with_failing_gesture(mut self, url: &str) -> Self {
        self.state_mut().failing_gestures.insert(url.to_string());
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.state_mut().fail_open = true;
        self
    }

    /// Cancels `token` as soon as the `opens`-th session is opened
    pub fn cancel_after_opens(mut self, opens: usize, token: CancellationToken) -> Self {
        self.state_mut().cancel_after_opens = Some((opens, token));
        self
    }

    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Highest number of sessions open at the same time
    pub fn max_live(&self) -> usize {
        self.state.max_live.load(Ordering::SeqCst)
    }

    /// Highest number of save prompts open at the same time, counted from
    /// a successful export until its gesture or session close
    pub fn max_open_prompts(&self) -> usize {
        self.state.max_open_prompts.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.navigations.lock().unwrap().clone()
    }

    pub fn exports(&self) -> Vec<String> {
        self.state.exports.lock().unwrap().clone()
    }

    pub fn gestures(&self) -> Vec<(String, HostGesture)> {
        self.state.gestures.lock().unwrap().clone()
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn open(&self) -> Result<Box<dyn Session>> {
        if self.state.fail_open {
            return Err(CrawlError::SessionCreateFailed {
                reason: "fake browser refused".to_string(),
            });
        }

        let opened = self.state.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let live = self.state.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_live.fetch_max(live, Ordering::SeqCst);

        if let Some((opens, token)) = &self.state.cancel_after_opens {
            if opened >= *opens {
                token.cancel();
            }
        }

        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
            current_url: None,
            closed: false,
            prompt_open: false,
        }))
    }
}

struct FakeSession {
    state: Arc<FakeState>,
    current_url: Option<String>,
    closed: bool,
    prompt_open: bool,
}

impl FakeSession {
    fn current_url(&self) -> String {
        self.current_url.clone().unwrap_or_default()
    }

    fn open_prompt(&mut self) {
        if !self.prompt_open {
            self.prompt_open = true;
            let open = self.state.open_prompts.fetch_add(1, Ordering::SeqCst) + 1;
            self.state.max_open_prompts.fetch_max(open, Ordering::SeqCst);
        }
    }

    fn dismiss_prompt(&mut self) {
        if self.prompt_open {
            self.prompt_open = false;
            self.state.open_prompts.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.state.navigations.lock().unwrap().push(url.to_string());
        if self.state.unreachable.contains(url) {
            return Err(CrawlError::NavigationFailed {
                url: url.to_string(),
                reason: "fake page is unreachable".to_string(),
            });
        }
        self.current_url = Some(url.to_string());
        Ok(())
    }

    async fn source(&mut self) -> Result<String> {
        let url = self.current_url();
        Ok(self
            .state
            .pages
            .get(&url)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn trigger_export(&mut self) -> Result<()> {
        let url = self.current_url();
        if self.state.failing_exports.contains(&url) {
            return Err(CrawlError::ExportTriggerFailed {
                url,
                reason: "fake export failed".to_string(),
            });
        }
        self.state.exports.lock().unwrap().push(url);
        self.open_prompt();
        Ok(())
    }

    async fn execute_host_gesture(&mut self, gesture: &HostGesture) -> Result<()> {
        let url = self.current_url();
        if self.state.failing_gestures.contains(&url) {
            return Err(CrawlError::HostGestureFailed {
                reason: format!("fake gesture failed on {}", url),
            });
        }
        self.state
            .gestures
            .lock()
            .unwrap()
            .push((url, gesture.clone()));
        self.dismiss_prompt();
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.dismiss_prompt();
        if !self.closed {
            self.closed = true;
            self.state.closed.fetch_add(1, Ordering::SeqCst);
            self.state.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
