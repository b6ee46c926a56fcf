//! Same-page retry policy
//!
//! A transient failure re-fetches the page it happened on. Attempts are
//! counted per page and reset when the crawl advances; backoff doubles per
//! attempt up to a ceiling.

use std::time::Duration;

use crate::config::SpiderConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` never gives up
    max_retries: Option<u32>,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: Option<u32>, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    #[must_use]
    pub fn from_config(config: &SpiderConfig) -> Self {
        Self::new(
            config.max_page_retries(),
            config.retry_base_delay(),
            config.retry_max_delay(),
        )
    }

    /// Whether retry number `attempt` (1-based) is allowed
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_retries.is_none_or(|max| attempt <= max)
    }

    /// Delay before retry number `attempt` (1-based)
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    #[must_use]
    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }
}
