//! URL builders for the profile feed

use super::constants::DEFAULT_FEED_BASE_URL;

/// Canonical feed URL for one page of a profile
#[must_use]
pub fn feed_page_url(base_url: &str, target: &str, page: u32) -> String {
    format!(
        "{}/{target}?is_search=0&visible=0&is_all=1&is_tag=0&profile_ftype=1&page={page}#feedtop",
        base_url.trim_end_matches('/')
    )
}

/// Profile landing URL used for manual link checks
///
/// Anything that already looks like a URL is passed through untouched.
#[must_use]
pub fn profile_url(base_url: &str, target: &str) -> String {
    let target = target.trim();
    if target.starts_with("http://") || target.starts_with("https://") {
        return target.to_string();
    }
    format!(
        "{}/{target}?topnav=1&wvr=6&topsug=1",
        base_url.trim_end_matches('/')
    )
}

/// Home page the login flow starts from
#[must_use]
pub fn home_url(base_url: &str) -> String {
    if base_url.is_empty() {
        DEFAULT_FEED_BASE_URL.to_string()
    } else {
        base_url.to_string()
    }
}
