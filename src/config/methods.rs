//! Builder methods available for all states

use std::path::PathBuf;
use std::time::Duration;

use super::builder::SpiderConfigBuilder;

impl<State> SpiderConfigBuilder<State> {
    #[must_use]
    pub fn feed_base_url(mut self, url: impl Into<String>) -> Self {
        self.feed_base_url = url.into();
        self
    }

    /// Run crawl surfaces headless (off by default)
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    #[must_use]
    pub fn page_ready_timeout(mut self, timeout: Duration) -> Self {
        self.page_ready_timeout = timeout;
        self
    }

    #[must_use]
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn scroll_step_px(mut self, px: u32) -> Self {
        self.scroll_step_px = px;
        self
    }

    #[must_use]
    pub fn scroll_interval(mut self, interval: Duration) -> Self {
        self.scroll_interval = interval;
        self
    }

    #[must_use]
    pub fn expand_settle_delay(mut self, delay: Duration) -> Self {
        self.expand_settle_delay = delay;
        self
    }

    /// Cap same-page retries after transient failures
    ///
    /// `None` retries indefinitely. A persistent cause such as an expired
    /// session then keeps the crawl spinning on one page until it is
    /// cancelled.
    #[must_use]
    pub fn max_page_retries(mut self, retries: Option<u32>) -> Self {
        self.max_page_retries = retries;
        self
    }

    /// Exponential backoff bounds between same-page retries
    #[must_use]
    pub fn retry_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay = base;
        self.retry_max_delay = max;
        self
    }

    #[must_use]
    pub fn chrome_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.chrome_data_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn status_capacity(mut self, capacity: usize) -> Self {
        self.status_capacity = capacity;
        self
    }
}
