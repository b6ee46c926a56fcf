//! Page extraction
//!
//! Turns one feed page into its text records: navigate, scroll until the
//! lazy-loaded feed has arrived, expand truncated posts, then read the
//! collapsed and full-text bodies.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::SpiderConfig;
use crate::crawl_engine::ExtractFailure;
use crate::status::StatusChannel;
use crate::surface::NavigableSurface;

pub mod extractors;

pub use extractors::FeedPageExtractor;

/// Produces the records visible on one page of a target's feed
#[async_trait]
pub trait PageExtractor: Send + Sync {
    /// Records for `page`, collapsed bodies first, then expanded bodies
    async fn extract_page(
        &self,
        surface: &dyn NavigableSurface,
        target: &str,
        page: u32,
        status: &StatusChannel,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExtractFailure>;
}

/// Timing and addressing knobs for [`FeedPageExtractor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub feed_base_url: String,
    pub scroll_step_px: u32,
    pub scroll_interval: Duration,
    /// Shared deadline for scroll polling and the next-page wait
    pub page_ready_timeout: Duration,
    pub expand_settle_delay: Duration,
    pub selector_poll_interval: Duration,
}

impl From<&SpiderConfig> for ExtractOptions {
    fn from(config: &SpiderConfig) -> Self {
        Self {
            feed_base_url: config.feed_base_url().to_string(),
            scroll_step_px: config.scroll_step_px(),
            scroll_interval: config.scroll_interval(),
            page_ready_timeout: config.page_ready_timeout(),
            expand_settle_delay: config.expand_settle_delay(),
            selector_poll_interval: crate::utils::SELECTOR_POLL_INTERVAL,
        }
    }
}
