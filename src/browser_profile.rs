//! Chrome profile directory management
//!
//! Every browser launch gets its own profile directory so a headed login
//! window and a headless crawl never contend for the same SingletonLock.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix for throwaway profile directories under the system temp dir
pub const PROFILE_PREFIX: &str = "feedscrape_chrome";

/// RAII wrapper for a Chrome profile directory
///
/// Ephemeral profiles are removed on drop. Persistent profiles (a directory the
/// user configured) are left in place.
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
    cleanup_on_drop: bool,
}

impl BrowserProfile {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.cleanup_on_drop
    }

    /// Consume the profile and return the path, disabling auto-cleanup
    pub fn into_path(mut self) -> PathBuf {
        self.cleanup_on_drop = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.cleanup_on_drop && self.path.exists() {
            debug!("BrowserProfile cleanup: removing {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!(
                    "Failed to cleanup profile directory {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

/// Create a unique throwaway profile directory named `{prefix}_{uuid}`
pub fn create_unique_profile_with_prefix(prefix: &str) -> Result<BrowserProfile> {
    let path = std::env::temp_dir().join(format!("{prefix}_{}", Uuid::new_v4()));

    // create_dir fails if the directory already exists
    std::fs::create_dir(&path)
        .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;

    info!("Created Chrome profile directory: {}", path.display());
    Ok(BrowserProfile {
        path,
        cleanup_on_drop: true,
    })
}

/// Profile for one browser mode
///
/// With a configured base directory the profile lives at `{base}/{mode}` and
/// persists; otherwise a throwaway temp directory is created.
pub fn profile_for_mode(base: Option<&Path>, headless: bool) -> Result<BrowserProfile> {
    let mode = if headless { "headless" } else { "headed" };
    match base {
        Some(base) => {
            let path = base.join(mode);
            std::fs::create_dir_all(&path).with_context(|| {
                format!("Failed to create profile directory: {}", path.display())
            })?;
            Ok(BrowserProfile {
                path,
                cleanup_on_drop: false,
            })
        }
        None => create_unique_profile_with_prefix(&format!("{PROFILE_PREFIX}_{mode}")),
    }
}
