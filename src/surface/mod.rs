//! Navigable surface abstraction
//!
//! A surface is one browser page the core can drive: navigate, scroll, query
//! selectors, click, read markup and move cookies in and out. The crawl
//! engine only talks to this trait, so tests substitute scripted surfaces and
//! production uses [`ChromeSurface`].

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::session::SessionCookie;

pub mod chrome;
pub mod cleanup;
pub mod enhance;
pub mod page_timeout;

pub use chrome::{ChromeSurface, ChromeSurfaceProvider};
pub use cleanup::{CleanupResult, cleanup_browser_and_data};
pub use page_timeout::with_page_timeout;

/// One controllable page
#[async_trait]
pub trait NavigableSurface: Send + Sync {
    async fn navigate(&self, url: &str) -> anyhow::Result<()>;

    /// Scroll down by `dy` pixels; returns the current document height
    async fn scroll_by(&self, dy: u32) -> anyhow::Result<u64>;

    async fn scroll_to_top(&self) -> anyhow::Result<()>;

    async fn exists(&self, selector: &str) -> anyhow::Result<bool>;

    /// Tag every element currently matching `selector` with `attribute`
    /// set to its position, returning how many were tagged
    ///
    /// Tags stay on their elements while the page changes around them, so
    /// [`click_marked`](Self::click_marked) reaches the same element even
    /// after earlier clicks removed others.
    async fn mark_all(&self, selector: &str, attribute: &str) -> anyhow::Result<usize>;

    /// Click the element tagged `index` by [`mark_all`](Self::mark_all)
    async fn click_marked(&self, attribute: &str, index: usize) -> anyhow::Result<()>;

    /// Inner markup of every element matching `selector`, in document order
    async fn inner_html_all(&self, selector: &str) -> anyhow::Result<Vec<String>>;

    async fn cookies(&self) -> anyhow::Result<Vec<SessionCookie>>;

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> anyhow::Result<()>;

    /// Close the page; later calls fail with a surface-closed error
    async fn close(&self) -> anyhow::Result<()>;
}

/// How a surface should be opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Headed window for interactive login
    pub visible: bool,
    pub initial_url: Option<String>,
}

impl SurfaceOptions {
    #[must_use]
    pub fn visible(initial_url: impl Into<String>) -> Self {
        Self {
            visible: true,
            initial_url: Some(initial_url.into()),
        }
    }

    #[must_use]
    pub fn background() -> Self {
        Self {
            visible: false,
            initial_url: None,
        }
    }
}

/// Factory for surfaces
#[async_trait]
pub trait SurfaceProvider: Send + Sync {
    async fn open(&self, options: SurfaceOptions) -> anyhow::Result<Box<dyn NavigableSurface>>;

    /// Release shared resources such as browser processes
    async fn shutdown(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Navigate a freshly opened surface to `url`, closing it if that fails
///
/// Providers finish `open` through this so a failed first navigation never
/// leaves a stray window behind.
pub async fn open_at(
    surface: Box<dyn NavigableSurface>,
    url: Option<&str>,
) -> anyhow::Result<Box<dyn NavigableSurface>> {
    if let Some(url) = url
        && let Err(e) = surface.navigate(url).await
    {
        discard(surface.as_ref()).await;
        return Err(e);
    }
    Ok(surface)
}

/// Close a surface that is being abandoned after an error
pub async fn discard(surface: &dyn NavigableSurface) {
    if let Err(e) = surface.close().await {
        log::debug!("Abandoned surface did not close cleanly: {e:#}");
    }
}

/// Why a wait ended early
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Surface(#[from] anyhow::Error),
}

/// Poll until `selector` exists on the surface
///
/// Ends with [`WaitError::TimedOut`] once `timeout` elapses and with
/// [`WaitError::Cancelled`] as soon as `cancel` fires.
pub async fn wait_for_selector(
    surface: &dyn NavigableSurface,
    selector: &str,
    timeout: Duration,
    poll: Duration,
    cancel: &CancellationToken,
) -> Result<(), WaitError> {
    let deadline = Instant::now() + timeout;
    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }
        if surface.exists(selector).await? {
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::TimedOut(timeout));
        }
        let nap = poll.min(deadline - now);
        tokio::select! {
            () = cancel.cancelled() => return Err(WaitError::Cancelled),
            () = tokio::time::sleep(nap) => {}
        }
    }
}

/// Sleep for `duration`; returns `false` if cancelled first
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}
