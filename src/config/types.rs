//! Core configuration type for feed crawling
//!
//! `SpiderConfig` carries every tunable the crawl, login and export stages
//! read. Construct it through [`SpiderConfig::builder`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration struct for crawl, login and export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpiderConfig {
    /// Root for persisted state.
    ///
    /// **INVARIANT:** Always an absolute path (normalized in builder).
    /// The session blob and the `csv/` artifact directory live under it.
    pub(crate) assets_dir: PathBuf,

    /// Origin of the feed service, without trailing slash
    pub(crate) feed_base_url: String,

    /// Run crawl surfaces without a visible window
    ///
    /// Login and link-check surfaces are always visible since a human has to
    /// interact with them.
    pub(crate) headless: bool,

    /// How long the login flow waits for the signed-in marker
    pub(crate) login_timeout: Duration,

    /// Deadline shared by scroll polling and the next-page wait on one page
    pub(crate) page_ready_timeout: Duration,

    /// Timeout for a single `goto`
    pub(crate) navigation_timeout: Duration,

    pub(crate) scroll_step_px: u32,
    pub(crate) scroll_interval: Duration,

    /// Pause after each expand-control click
    pub(crate) expand_settle_delay: Duration,

    /// Retries allowed for one page after a transient failure
    ///
    /// `None` retries forever, stopping only on cancellation or a fatal
    /// failure.
    pub(crate) max_page_retries: Option<u32>,
    pub(crate) retry_base_delay: Duration,
    pub(crate) retry_max_delay: Duration,

    /// Explicit Chrome profile directory; a unique temp profile otherwise
    pub(crate) chrome_data_dir: Option<PathBuf>,

    /// Buffer size of the status broadcast channel
    pub(crate) status_capacity: usize,
}
