//! Getter methods for `SpiderConfig`

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::SpiderConfig;
use crate::utils::{EXPORT_DIR_NAME, SESSION_FILE_NAME};

impl SpiderConfig {
    #[must_use]
    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Location of the persisted session blob
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.assets_dir.join(SESSION_FILE_NAME)
    }

    /// Directory export artifacts are written to
    #[must_use]
    pub fn export_dir(&self) -> PathBuf {
        self.assets_dir.join(EXPORT_DIR_NAME)
    }

    #[must_use]
    pub fn feed_base_url(&self) -> &str {
        &self.feed_base_url
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn login_timeout(&self) -> Duration {
        self.login_timeout
    }

    #[must_use]
    pub fn page_ready_timeout(&self) -> Duration {
        self.page_ready_timeout
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        self.navigation_timeout
    }

    #[must_use]
    pub fn scroll_step_px(&self) -> u32 {
        self.scroll_step_px
    }

    #[must_use]
    pub fn scroll_interval(&self) -> Duration {
        self.scroll_interval
    }

    #[must_use]
    pub fn expand_settle_delay(&self) -> Duration {
        self.expand_settle_delay
    }

    #[must_use]
    pub fn max_page_retries(&self) -> Option<u32> {
        self.max_page_retries
    }

    #[must_use]
    pub fn retry_base_delay(&self) -> Duration {
        self.retry_base_delay
    }

    #[must_use]
    pub fn retry_max_delay(&self) -> Duration {
        self.retry_max_delay
    }

    #[must_use]
    pub fn chrome_data_dir(&self) -> Option<&PathBuf> {
        self.chrome_data_dir.as_ref()
    }

    #[must_use]
    pub fn status_capacity(&self) -> usize {
        self.status_capacity
    }
}
