//! Test utilities for the feedscrape test suite
//!
//! Scripted surfaces and extractors stand in for Chrome so every crawl
//! property can be exercised without launching a browser.

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use feedscrape::crawl_engine::ExtractFailure;
use feedscrape::page_extractor::PageExtractor;
use feedscrape::session::{Session, SessionCookie, SessionStore};
use feedscrape::status::{LogEntry, StatusChannel};
use feedscrape::surface::{NavigableSurface, SurfaceOptions, SurfaceProvider, open_at};
use feedscrape::utils::{
    COLLAPSED_CONTENT_SELECTOR, EXPAND_CONTROL_SELECTOR, FULL_CONTENT_SELECTOR,
    LOGIN_MARKER_SELECTOR, NEXT_PAGE_SELECTOR,
};
use feedscrape::SpiderConfig;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Config with millisecond timings so retry and wait paths finish quickly
pub fn test_config(assets: &Path) -> SpiderConfig {
    SpiderConfig::builder()
        .assets_dir(assets.to_path_buf())
        .login_timeout(Duration::from_millis(600))
        .page_ready_timeout(Duration::from_millis(300))
        .navigation_timeout(Duration::from_secs(5))
        .scroll_interval(Duration::from_millis(1))
        .expand_settle_delay(Duration::from_millis(1))
        .retry_backoff(Duration::from_millis(1), Duration::from_millis(4))
        .build()
        .unwrap()
}

pub fn test_config_with_retries(assets: &Path, retries: Option<u32>) -> SpiderConfig {
    SpiderConfig::builder()
        .assets_dir(assets.to_path_buf())
        .page_ready_timeout(Duration::from_millis(300))
        .retry_backoff(Duration::from_millis(1), Duration::from_millis(4))
        .max_page_retries(retries)
        .build()
        .unwrap()
}

pub fn sample_session() -> Session {
    Session::new(vec![
        SessionCookie::new("SUB", "token", ".weibo.com"),
        SessionCookie::new("SUBP", "profile", ".weibo.com"),
    ])
}

/// Persist a session where the config expects it
pub async fn write_session(config: &SpiderConfig) {
    SessionStore::new(config.session_path())
        .save(&sample_session())
        .await
        .unwrap();
}

pub fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

pub fn messages(history: &[LogEntry]) -> Vec<String> {
    history.iter().map(|e| e.message.clone()).collect()
}

pub fn has_message(history: &[LogEntry], message: &str) -> bool {
    history.iter().any(|e| e.message == message)
}

/// Files currently in a directory (empty if it does not exist)
pub fn files_in(dir: &Path) -> Vec<std::path::PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

// =============================================================================
// Scripted surface
// =============================================================================

/// DOM content served for one feed page
#[derive(Debug, Clone, Default)]
pub struct PageFixture {
    pub collapsed: Vec<String>,
    pub full: Vec<String>,
    pub expand_controls: usize,
}

/// How every surface from a [`MockProvider`] behaves
#[derive(Debug, Clone)]
pub struct SurfaceScript {
    /// Login marker appears once it has been polled more than this many times;
    /// `None` never shows it
    pub login_after_polls: Option<usize>,
    /// Next-page control appears after this many scroll steps; `None` never
    pub next_page_after_scrolls: Option<usize>,
    pub document_height: u64,
    pub pages: HashMap<u32, PageFixture>,
    pub cookies: Vec<SessionCookie>,
    pub fail_navigation: bool,
    pub fail_clicks: bool,
    /// A clicked expand control leaves the page, like a post swapping in
    /// its full text
    pub clicks_remove_controls: bool,
    pub fail_set_cookies: bool,
    /// Surface reports itself closed right after navigating
    pub close_after_navigate: bool,
}

impl Default for SurfaceScript {
    fn default() -> Self {
        Self {
            login_after_polls: Some(0),
            next_page_after_scrolls: Some(0),
            document_height: 2_000,
            pages: HashMap::new(),
            cookies: sample_session().into_cookies(),
            fail_navigation: false,
            fail_clicks: false,
            clicks_remove_controls: false,
            fail_set_cookies: false,
            close_after_navigate: false,
        }
    }
}

/// What happened to one surface
#[derive(Debug, Clone, Default)]
pub struct SurfaceRecord {
    pub navigations: Vec<String>,
    pub current_page: Option<u32>,
    pub scrolls: usize,
    pub rewinds: usize,
    pub login_polls: usize,
    /// Ids of the expand controls still on the page
    pub present_controls: Vec<usize>,
    /// Ids tagged by the last `mark_all`, by position
    pub marked_controls: Vec<usize>,
    /// Ids of clicked expand controls
    pub clicks: Vec<usize>,
    pub installed_cookies: Vec<SessionCookie>,
    pub closed: bool,
}

pub struct MockSurface {
    script: Arc<SurfaceScript>,
    record: Arc<Mutex<SurfaceRecord>>,
}

impl MockSurface {
    pub fn new(script: SurfaceScript) -> Self {
        Self {
            script: Arc::new(script),
            record: Arc::new(Mutex::new(SurfaceRecord::default())),
        }
    }

    pub fn record(&self) -> SurfaceRecord {
        self.record.lock().clone()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.record.lock().closed {
            return Err(anyhow!("Protocol error: Target closed"));
        }
        Ok(())
    }

    fn fixture(&self) -> PageFixture {
        let page = self.record.lock().current_page;
        page.and_then(|p| self.script.pages.get(&p).cloned())
            .unwrap_or_default()
    }
}

fn page_from_url(url: &str) -> Option<u32> {
    let query = url.split('?').nth(1)?;
    query
        .split(['&', '#'])
        .find_map(|pair| pair.strip_prefix("page="))
        .and_then(|n| n.parse().ok())
}

#[async_trait]
impl NavigableSurface for MockSurface {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.ensure_open()?;
        if self.script.fail_navigation {
            return Err(anyhow!("net::ERR_CONNECTION_RESET"));
        }
        let mut record = self.record.lock();
        record.navigations.push(url.to_string());
        record.current_page = page_from_url(url);
        record.scrolls = 0;
        let controls = record
            .current_page
            .and_then(|p| self.script.pages.get(&p))
            .map_or(0, |fixture| fixture.expand_controls);
        record.present_controls = (0..controls).collect();
        record.marked_controls.clear();
        if self.script.close_after_navigate {
            record.closed = true;
        }
        Ok(())
    }

    async fn scroll_by(&self, _dy: u32) -> Result<u64> {
        self.ensure_open()?;
        self.record.lock().scrolls += 1;
        Ok(self.script.document_height)
    }

    async fn scroll_to_top(&self) -> Result<()> {
        self.ensure_open()?;
        self.record.lock().rewinds += 1;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        self.ensure_open()?;
        let mut record = self.record.lock();
        match selector {
            LOGIN_MARKER_SELECTOR => {
                record.login_polls += 1;
                Ok(self
                    .script
                    .login_after_polls
                    .is_some_and(|n| record.login_polls > n))
            }
            NEXT_PAGE_SELECTOR => Ok(self
                .script
                .next_page_after_scrolls
                .is_some_and(|n| record.scrolls >= n)),
            _ => Ok(false),
        }
    }

    async fn mark_all(&self, selector: &str, _attribute: &str) -> Result<usize> {
        self.ensure_open()?;
        let mut record = self.record.lock();
        if selector != EXPAND_CONTROL_SELECTOR {
            return Ok(0);
        }
        record.marked_controls = record.present_controls.clone();
        Ok(record.marked_controls.len())
    }

    async fn click_marked(&self, _attribute: &str, index: usize) -> Result<()> {
        self.ensure_open()?;
        if self.script.fail_clicks {
            return Err(anyhow!("Element is not clickable at point"));
        }
        let mut record = self.record.lock();
        let id = record
            .marked_controls
            .get(index)
            .copied()
            .filter(|id| record.present_controls.contains(id))
            .ok_or_else(|| anyhow!("marked element #{index} is no longer on the page"))?;
        record.clicks.push(id);
        if self.script.clicks_remove_controls {
            record.present_controls.retain(|present| *present != id);
        }
        Ok(())
    }

    async fn inner_html_all(&self, selector: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        let fixture = self.fixture();
        Ok(match selector {
            COLLAPSED_CONTENT_SELECTOR => fixture.collapsed,
            FULL_CONTENT_SELECTOR => fixture.full,
            _ => Vec::new(),
        })
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        self.ensure_open()?;
        Ok(self.script.cookies.clone())
    }

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<()> {
        self.ensure_open()?;
        if self.script.fail_set_cookies {
            return Err(anyhow!("Network.setCookies rejected"));
        }
        self.record.lock().installed_cookies = cookies.to_vec();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record.lock().closed = true;
        Ok(())
    }
}

/// Hands out [`MockSurface`]s and remembers how each was opened
pub struct MockProvider {
    script: SurfaceScript,
    pub fail_open: bool,
    opened: Mutex<Vec<(SurfaceOptions, Arc<Mutex<SurfaceRecord>>)>>,
}

impl MockProvider {
    pub fn new(script: SurfaceScript) -> Self {
        Self {
            script,
            fail_open: false,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn opened_options(&self) -> Vec<SurfaceOptions> {
        self.opened.lock().iter().map(|(o, _)| o.clone()).collect()
    }

    pub fn records(&self) -> Vec<SurfaceRecord> {
        self.opened.lock().iter().map(|(_, r)| r.lock().clone()).collect()
    }
}

#[async_trait]
impl SurfaceProvider for MockProvider {
    async fn open(&self, options: SurfaceOptions) -> Result<Box<dyn NavigableSurface>> {
        if self.fail_open {
            return Err(anyhow!("Failed to launch browser"));
        }
        let surface = MockSurface::new(self.script.clone());
        self.opened
            .lock()
            .push((options.clone(), Arc::clone(&surface.record)));
        open_at(Box::new(surface), options.initial_url.as_deref()).await
    }
}

// =============================================================================
// Scripted extractor
// =============================================================================

pub type PageResult = Result<Vec<String>, ExtractFailure>;

/// Returns scripted results in order, then repeats `fallback`
pub struct ScriptedExtractor {
    script: Mutex<VecDeque<PageResult>>,
    fallback: PageResult,
    calls: Mutex<Vec<u32>>,
    /// Fire the crawl's own cancellation token once this many calls were made
    cancel_after_calls: Option<usize>,
    /// When set, every call waits here until notified or cancelled
    gate: Option<Arc<Notify>>,
}

impl ScriptedExtractor {
    pub fn new(script: Vec<PageResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Ok(Vec::new()),
            calls: Mutex::new(Vec::new()),
            cancel_after_calls: None,
            gate: None,
        }
    }

    pub fn with_fallback(mut self, fallback: PageResult) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn cancel_after(mut self, calls: usize) -> Self {
        self.cancel_after_calls = Some(calls);
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl PageExtractor for ScriptedExtractor {
    async fn extract_page(
        &self,
        _surface: &dyn NavigableSurface,
        _target: &str,
        page: u32,
        _status: &StatusChannel,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExtractFailure> {
        let call_count = {
            let mut calls = self.calls.lock();
            calls.push(page);
            calls.len()
        };

        if let Some(gate) = &self.gate {
            tokio::select! {
                () = gate.notified() => {}
                () = cancel.cancelled() => {
                    return Err(ExtractFailure::cancelled(feedscrape::ExtractStep::Extract));
                }
            }
        }

        let result = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        if self.cancel_after_calls.is_some_and(|n| call_count >= n) {
            cancel.cancel();
        }
        result
    }
}
