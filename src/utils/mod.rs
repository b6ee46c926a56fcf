pub mod constants;
pub mod string_utils;
pub mod url_utils;

pub use constants::*;
pub use string_utils::{collapsed_record, is_truncated, safe_truncate_chars, strip_markup};
pub use url_utils::{feed_page_url, home_url, profile_url};
