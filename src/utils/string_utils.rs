//! Text cleanup for extracted feed bodies
//!
//! Feed bodies come back from the DOM as `innerHTML`. Records keep only the
//! text between tags, trimmed.

use regex::Regex;
use std::sync::LazyLock;

use super::constants::TRUNCATION_MARKER;

// Non-greedy: one match per tag.
static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*?>").expect("MARKUP_TAG: hardcoded regex is valid"));

/// Remove every markup tag and trim surrounding whitespace
#[must_use]
pub fn strip_markup(html: &str) -> String {
    MARKUP_TAG.replace_all(html, "").trim().to_string()
}

/// Whether a stripped collapsed body still ends with the expand prompt
#[must_use]
pub fn is_truncated(text: &str) -> bool {
    text.ends_with(TRUNCATION_MARKER)
}

/// Collapsed bodies whose full text is elsewhere become empty records
///
/// The empty record is kept so the page's record count is stable; export drops it.
#[must_use]
pub fn collapsed_record(html: &str) -> String {
    let text = strip_markup(html);
    if is_truncated(&text) { String::new() } else { text }
}

/// Safely truncate a string to a maximum number of characters (not bytes)
///
/// Used to keep log details readable when the browser hands back an entire
/// page of HTML inside an error message.
#[inline]
#[must_use]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_but_keeps_text_between_them() {
        let html = "  <a href=\"x\">@someone</a> said <br/>hello <img src=\"e.png\">  ";
        assert_eq!(strip_markup(html), "@someone said hello");
    }

    #[test]
    fn truncated_collapsed_body_becomes_empty() {
        let html = "first half of a long post<a action-type=\"fl_unfold\">...展开全文c</a>";
        assert_eq!(collapsed_record(html), "");
    }

    #[test]
    fn complete_collapsed_body_survives() {
        assert_eq!(collapsed_record("<p>short post</p>"), "short post");
    }

    #[test]
    fn truncation_respects_multibyte_characters() {
        assert_eq!(safe_truncate_chars("展开全文", 2), "展开");
        assert_eq!(safe_truncate_chars("hi", 10), "hi");
    }
}
