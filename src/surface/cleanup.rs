//! Browser teardown

use anyhow::Result;
use chromiumoxide::Browser;
use log::{debug, warn};
use tokio::task::JoinHandle;

use crate::browser_profile::BrowserProfile;

/// Result of cleanup operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupResult {
    Success,
    /// Some steps failed, with error details
    PartialFailure(Vec<String>),
}

/// Close the browser, wait for its process, stop the handler and drop the profile
pub async fn cleanup_browser_and_data(
    mut browser: Browser,
    handler: JoinHandle<()>,
    profile: BrowserProfile,
) -> Result<CleanupResult> {
    let mut errors = Vec::new();

    debug!(target: "feedscrape::cleanup", "Closing browser");
    if let Err(e) = browser.close().await {
        warn!(target: "feedscrape::cleanup", "Failed to close browser: {e}");
        errors.push(format!("Browser close failed: {e}"));
    }

    // Wait for the process so chromiumoxide does not warn about an unclosed browser
    if let Err(e) = browser.wait().await {
        warn!(target: "feedscrape::cleanup", "Failed to wait for browser exit: {e}");
        errors.push(format!("Browser wait failed: {e}"));
    }

    handler.abort();

    // Ephemeral profiles remove their directory here
    let ephemeral = profile.is_ephemeral();
    drop(profile);
    debug!(target: "feedscrape::cleanup", "Browser released (ephemeral profile: {ephemeral})");

    if errors.is_empty() {
        Ok(CleanupResult::Success)
    } else {
        Ok(CleanupResult::PartialFailure(errors))
    }
}
