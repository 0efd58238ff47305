//! Input checks applied before admin payloads and public submissions are sent.

use once_cell::sync::Lazy;
use regex::Regex;

static RICH_TEXT_CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"img|>\s*[^<\s]").expect("valid rich text regex"));

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(https?|ftp)://([a-z0-9-]+\.)+[a-z]{2,}(:\d{1,5})?([/?#][^\s]*)?$")
        .expect("valid url regex")
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@([A-Za-z0-9-]+\.)+[A-Za-z]{2,}$")
        .expect("valid email regex")
});

pub fn is_valid_text(s: Option<&str>) -> bool {
    s.is_some_and(|s| !s.trim().is_empty())
}

/// Rich text counts as non-empty if it embeds an image or has visible text
/// after some tag.
pub fn is_valid_rich_text(s: Option<&str>) -> bool {
    s.is_some_and(|s| RICH_TEXT_CONTENT.is_match(s))
}

pub fn is_valid_url(s: Option<&str>) -> bool {
    s.is_some_and(|s| URL.is_match(s))
}

pub fn is_valid_email(s: Option<&str>) -> bool {
    s.is_some_and(|s| EMAIL.is_match(s))
}

pub fn is_valid_hex_color(s: Option<&str>) -> bool {
    s.is_some_and(|s| {
        s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
    })
}

pub fn is_valid_number(n: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    n.is_some_and(|n| {
        !n.is_nan() && min.is_none_or(|min| min <= n) && max.is_none_or(|max| max >= n)
    })
}
