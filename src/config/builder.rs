//! Type-safe builder for `SpiderConfig` using the typestate pattern
//!
//! The assets directory is the only required field; `build()` is unavailable
//! until it has been set.

use anyhow::{Result, anyhow};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use super::types::SpiderConfig;
use crate::utils::{
    DEFAULT_EXPAND_SETTLE_DELAY, DEFAULT_FEED_BASE_URL, DEFAULT_LOGIN_TIMEOUT,
    DEFAULT_MAX_PAGE_RETRIES, DEFAULT_NAVIGATION_TIMEOUT, DEFAULT_PAGE_READY_TIMEOUT,
    DEFAULT_RETRY_BASE_DELAY, DEFAULT_RETRY_MAX_DELAY, DEFAULT_SCROLL_INTERVAL,
    DEFAULT_SCROLL_STEP_PX, DEFAULT_STATUS_CAPACITY,
};

/// Environment variable consulted by [`SpiderConfigBuilder::assets_dir_from_env`]
pub const ASSETS_DIR_ENV: &str = "FEEDSCRAPE_ASSETS_DIR";

// Type states for the builder
pub struct WithAssetsDir;

pub struct SpiderConfigBuilder<State = ()> {
    pub(crate) assets_dir: Option<PathBuf>,
    pub(crate) feed_base_url: String,
    pub(crate) headless: bool,
    pub(crate) login_timeout: Duration,
    pub(crate) page_ready_timeout: Duration,
    pub(crate) navigation_timeout: Duration,
    pub(crate) scroll_step_px: u32,
    pub(crate) scroll_interval: Duration,
    pub(crate) expand_settle_delay: Duration,
    pub(crate) max_page_retries: Option<u32>,
    pub(crate) retry_base_delay: Duration,
    pub(crate) retry_max_delay: Duration,
    pub(crate) chrome_data_dir: Option<PathBuf>,
    pub(crate) status_capacity: usize,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for SpiderConfigBuilder<()> {
    fn default() -> Self {
        Self {
            assets_dir: None,
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            headless: false,
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            page_ready_timeout: DEFAULT_PAGE_READY_TIMEOUT,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            scroll_step_px: DEFAULT_SCROLL_STEP_PX,
            scroll_interval: DEFAULT_SCROLL_INTERVAL,
            expand_settle_delay: DEFAULT_EXPAND_SETTLE_DELAY,
            max_page_retries: Some(DEFAULT_MAX_PAGE_RETRIES),
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            retry_max_delay: DEFAULT_RETRY_MAX_DELAY,
            chrome_data_dir: None,
            status_capacity: DEFAULT_STATUS_CAPACITY,
            _phantom: PhantomData,
        }
    }
}

impl SpiderConfig {
    /// Create a builder for configuring a `SpiderConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> SpiderConfigBuilder<()> {
        SpiderConfigBuilder::default()
    }
}

impl SpiderConfigBuilder<()> {
    pub fn assets_dir(self, dir: impl Into<PathBuf>) -> SpiderConfigBuilder<WithAssetsDir> {
        SpiderConfigBuilder {
            assets_dir: Some(dir.into()),
            feed_base_url: self.feed_base_url,
            headless: self.headless,
            login_timeout: self.login_timeout,
            page_ready_timeout: self.page_ready_timeout,
            navigation_timeout: self.navigation_timeout,
            scroll_step_px: self.scroll_step_px,
            scroll_interval: self.scroll_interval,
            expand_settle_delay: self.expand_settle_delay,
            max_page_retries: self.max_page_retries,
            retry_base_delay: self.retry_base_delay,
            retry_max_delay: self.retry_max_delay,
            chrome_data_dir: self.chrome_data_dir,
            status_capacity: self.status_capacity,
            _phantom: PhantomData,
        }
    }

    /// Resolve the assets directory from `FEEDSCRAPE_ASSETS_DIR`, falling back
    /// to the platform's local data directory
    pub fn assets_dir_from_env(self) -> Result<SpiderConfigBuilder<WithAssetsDir>> {
        let dir = match std::env::var(ASSETS_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => dirs::data_local_dir()
                .map(|d| d.join("feedscrape"))
                .ok_or_else(|| anyhow!("Could not determine a local data directory; set {ASSETS_DIR_ENV}"))?,
        };
        Ok(self.assets_dir(dir))
    }
}

impl SpiderConfigBuilder<WithAssetsDir> {
    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// Fails when the assets dir cannot be made absolute, the base URL is not
    /// http(s), or a numeric setting is zero where zero would stall the crawl.
    pub fn build(self) -> Result<SpiderConfig> {
        let assets_dir = self
            .assets_dir
            .ok_or_else(|| anyhow!("assets_dir is required"))?;
        let assets_dir = if assets_dir.is_absolute() {
            assets_dir
        } else {
            std::env::current_dir()
                .map_err(|e| anyhow!("Failed to resolve current directory: {e}"))?
                .join(assets_dir)
        };

        let feed_base_url = self.feed_base_url.trim_end_matches('/').to_string();
        if !(feed_base_url.starts_with("http://") || feed_base_url.starts_with("https://")) {
            return Err(anyhow!(
                "feed_base_url must start with http:// or https://, got '{feed_base_url}'"
            ));
        }

        if self.scroll_step_px == 0 {
            return Err(anyhow!("scroll_step_px must be greater than zero"));
        }
        if self.status_capacity == 0 {
            return Err(anyhow!("status_capacity must be greater than zero"));
        }
        if self.retry_base_delay > self.retry_max_delay {
            return Err(anyhow!(
                "retry_base_delay ({:?}) exceeds retry_max_delay ({:?})",
                self.retry_base_delay,
                self.retry_max_delay
            ));
        }

        Ok(SpiderConfig {
            assets_dir,
            feed_base_url,
            headless: self.headless,
            login_timeout: self.login_timeout,
            page_ready_timeout: self.page_ready_timeout,
            navigation_timeout: self.navigation_timeout,
            scroll_step_px: self.scroll_step_px,
            scroll_interval: self.scroll_interval,
            expand_settle_delay: self.expand_settle_delay,
            max_page_retries: self.max_page_retries,
            retry_base_delay: self.retry_base_delay,
            retry_max_delay: self.retry_max_delay,
            chrome_data_dir: self.chrome_data_dir,
            status_capacity: self.status_capacity,
        })
    }
}
