//! Shared constants for feedscrape
//!
//! Selectors, URL templates and timing defaults for the profile feed layout.
//! Kept in one place so the extractor, authenticator and config builder agree.

use std::time::Duration;

/// Default origin of the profile feed service
pub const DEFAULT_FEED_BASE_URL: &str = "https://www.weibo.com";

/// Element that only renders once a user is signed in (the nickname badge)
pub const LOGIN_MARKER_SELECTOR: &str = ".gn_name";

/// Pagination control at the bottom of a fully loaded feed page
///
/// Its presence is the signal that every lazy-loaded chunk of the page has
/// arrived.
pub const NEXT_PAGE_SELECTOR: &str = r#"a[suda-uatrack="key=tblog_profile_v6&value=weibo_page"]"#;

/// "Expand full text" link attached to long posts
pub const EXPAND_CONTROL_SELECTOR: &str = r#"a[action-type="fl_unfold"]"#;

/// Attribute that pins each expand control to its position before clicking
pub const EXPAND_MARK_ATTRIBUTE: &str = "data-fs-expand";

/// Collapsed post body
pub const COLLAPSED_CONTENT_SELECTOR: &str = r#"div[node-type="feed_list_content"]"#;

/// Post body revealed by the expand control
pub const FULL_CONTENT_SELECTOR: &str = r#"div[node-type="feed_list_content_full"]"#;

/// Trailing text of a collapsed body whose full text lives elsewhere
pub const TRUNCATION_MARKER: &str = "...展开全文c";

/// Column header of the exported table ("content")
pub const EXPORT_HEADER_LABEL: &str = "内容";

/// Directory under the assets dir holding export artifacts
pub const EXPORT_DIR_NAME: &str = "csv";

/// Extension of export artifacts
pub const EXPORT_EXTENSION: &str = "csv";

/// File name of the persisted session blob under the assets dir
pub const SESSION_FILE_NAME: &str = "cookies.json";

/// Default destination name when copying an artifact without a target path
pub const DEFAULT_EXPORT_FILE_NAME: &str = "spider.csv";

/// Byte-order marker written ahead of the serialized table
pub const UTF8_BOM: &str = "\u{feff}";

/// Second-resolution timestamp used in artifact names
pub const ARTIFACT_TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// Human login and slow feed pages both get an hour by default
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(3600);
pub const DEFAULT_PAGE_READY_TIMEOUT: Duration = Duration::from_secs(3600);
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_SCROLL_STEP_PX: u32 = 200;
pub const DEFAULT_SCROLL_INTERVAL: Duration = Duration::from_millis(100);

/// Pause between expand clicks
///
/// Clicking every expand link at once trips the site's "network error"
/// interstitial.
pub const DEFAULT_EXPAND_SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Poll interval for selector waits
pub const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub const DEFAULT_MAX_PAGE_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

pub const DEFAULT_STATUS_CAPACITY: usize = 1000;

/// Error message fragments meaning the browser surface went away underneath us
///
/// Matched case-insensitively.
pub const SURFACE_CLOSED_MARKERS: &[&str] = &[
    "target closed",
    "session closed",
    "no target with given id",
    "surface closed",
];

/// Chrome user agent string for stealth mode
///
/// Update quarterly to stay within a reasonable version window.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
