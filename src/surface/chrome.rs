//! Chrome-backed surfaces
//!
//! [`ChromeSurfaceProvider`] owns up to two browser processes (headed for
//! login, headless for crawling) and launches each lazily. Every
//! [`ChromeSurface`] is one tab in one of them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use chromiumoxide::{Browser, Page};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cleanup::{CleanupResult, cleanup_browser_and_data};
use super::enhance::enhance_page;
use super::page_timeout::with_page_timeout;
use super::{NavigableSurface, SurfaceOptions, SurfaceProvider, discard, open_at};
use crate::browser_profile::{BrowserProfile, profile_for_mode};
use crate::browser_setup::launch_browser;
use crate::config::SpiderConfig;
use crate::session::SessionCookie;

/// Selector as a JS string literal
fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// One Chrome tab
pub struct ChromeSurface {
    page: Page,
    navigation_timeout: Duration,
    closed: AtomicBool,
}

impl ChromeSurface {
    #[must_use]
    pub fn new(page: Page, navigation_timeout: Duration) -> Self {
        Self {
            page,
            navigation_timeout,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            anyhow::bail!("surface closed");
        }
        Ok(())
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T> {
        self.ensure_open()?;
        let result = self
            .page
            .evaluate(script)
            .await
            .context("Failed to evaluate script")?;
        result
            .into_value::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to read script result: {e}"))
    }
}

#[async_trait]
impl NavigableSurface for ChromeSurface {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.ensure_open()?;
        debug!(url, "Navigating");
        with_page_timeout(
            async {
                self.page
                    .goto(url)
                    .await
                    .with_context(|| format!("Failed to navigate to {url}"))?;
                Ok(())
            },
            self.navigation_timeout,
            "Navigation",
        )
        .await
    }

    async fn scroll_by(&self, dy: u32) -> Result<u64> {
        let height: f64 = self
            .eval(format!(
                "(() => {{ window.scrollBy(0, {dy}); \
                 return document.body ? document.body.scrollHeight : 0; }})()"
            ))
            .await?;
        Ok(height.max(0.0) as u64)
    }

    async fn scroll_to_top(&self) -> Result<()> {
        let _: bool = self
            .eval("(() => { window.scrollTo(0, 0); return true; })()".to_string())
            .await?;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        self.eval(format!(
            "document.querySelector({}) !== null",
            js_str(selector)
        ))
        .await
    }

    async fn mark_all(&self, selector: &str, attribute: &str) -> Result<usize> {
        self.eval(format!(
            "(() => {{ const els = document.querySelectorAll({}); \
             els.forEach((el, i) => el.setAttribute({}, String(i))); \
             return els.length; }})()",
            js_str(selector),
            js_str(attribute)
        ))
        .await
    }

    async fn click_marked(&self, attribute: &str, index: usize) -> Result<()> {
        let tagged = format!("[{attribute}=\"{index}\"]");
        let clicked: bool = self
            .eval(format!(
                "(() => {{ const el = document.querySelector({}); \
                 if (!el) return false; el.click(); return true; }})()",
                js_str(&tagged)
            ))
            .await?;
        if !clicked {
            anyhow::bail!("marked element #{index} is no longer on the page");
        }
        Ok(())
    }

    async fn inner_html_all(&self, selector: &str) -> Result<Vec<String>> {
        self.eval(format!(
            "Array.from(document.querySelectorAll({})).map(el => el.innerHTML)",
            js_str(selector)
        ))
        .await
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        self.ensure_open()?;
        let cookies = self
            .page
            .get_cookies()
            .await
            .context("Failed to read cookies")?;
        Ok(cookies.into_iter().map(cookie_from_cdp).collect())
    }

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<()> {
        self.ensure_open()?;
        let params = cookies.iter().map(cookie_to_cdp).collect::<Vec<_>>();
        self.page
            .set_cookies(params)
            .await
            .context("Failed to install cookies")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.page
            .clone()
            .close()
            .await
            .context("Failed to close page")?;
        Ok(())
    }
}

fn cookie_from_cdp(cookie: Cookie) -> SessionCookie {
    SessionCookie {
        expires: (!cookie.session && cookie.expires > 0.0).then_some(cookie.expires),
        same_site: cookie.same_site.map(|s| s.as_ref().to_string()),
        name: cookie.name,
        value: cookie.value,
        domain: cookie.domain,
        path: cookie.path,
        http_only: cookie.http_only,
        secure: cookie.secure,
        session: cookie.session,
    }
}

fn cookie_to_cdp(cookie: &SessionCookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.domain = Some(cookie.domain.clone());
    param.path = Some(cookie.path.clone());
    param.secure = Some(cookie.secure);
    param.http_only = Some(cookie.http_only);
    param.same_site = cookie
        .same_site
        .as_deref()
        .and_then(|s| s.parse::<CookieSameSite>().ok());
    param.expires = cookie.expires.map(TimeSinceEpoch::new);
    param
}

struct RunningBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
    profile: BrowserProfile,
}

/// Launches Chrome on demand and hands out tabs
pub struct ChromeSurfaceProvider {
    profile_base: Option<PathBuf>,
    crawl_headless: bool,
    navigation_timeout: Duration,
    headed: Mutex<Option<RunningBrowser>>,
    headless: Mutex<Option<RunningBrowser>>,
}

impl ChromeSurfaceProvider {
    #[must_use]
    pub fn new(config: &SpiderConfig) -> Self {
        Self {
            profile_base: config.chrome_data_dir().cloned(),
            crawl_headless: config.headless(),
            navigation_timeout: config.navigation_timeout(),
            headed: Mutex::new(None),
            headless: Mutex::new(None),
        }
    }

    async fn new_page(&self, headless: bool) -> Result<Page> {
        let slot = if headless { &self.headless } else { &self.headed };
        let mut guard = slot.lock().await;
        if guard.is_none() {
            let profile = profile_for_mode(self.profile_base.as_deref(), headless)?;
            let (browser, handler) = launch_browser(headless, profile.path()).await?;
            *guard = Some(RunningBrowser {
                browser,
                handler,
                profile,
            });
        }
        let running = guard
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("browser not running"))?;
        let page = running
            .browser
            .new_page("about:blank")
            .await
            .context("Failed to open a new tab")?;
        Ok(page)
    }
}

#[async_trait]
impl SurfaceProvider for ChromeSurfaceProvider {
    async fn open(&self, options: SurfaceOptions) -> Result<Box<dyn NavigableSurface>> {
        // Login always needs a window; crawling follows the configured mode
        let headless = !options.visible && self.crawl_headless;
        let page = self.new_page(headless).await?;
        let surface = ChromeSurface::new(page, self.navigation_timeout);
        if let Err(e) = enhance_page(&surface.page, headless).await {
            discard(&surface).await;
            return Err(e);
        }
        open_at(Box::new(surface), options.initial_url.as_deref()).await
    }

    async fn shutdown(&self) -> Result<()> {
        for slot in [&self.headed, &self.headless] {
            if let Some(running) = slot.lock().await.take() {
                match cleanup_browser_and_data(running.browser, running.handler, running.profile)
                    .await?
                {
                    CleanupResult::Success => info!("Browser shut down"),
                    CleanupResult::PartialFailure(errors) => {
                        warn!("Browser shutdown incomplete: {}", errors.join("; "));
                    }
                }
            }
        }
        Ok(())
    }
}
