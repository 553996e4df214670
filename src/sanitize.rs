//! Regex-based cleanup of model-produced HTML fragments.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FENCED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\s*```$").expect("valid fence regex")
});
static LANG_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^html[ \t]*\r?\n").expect("valid prefix regex"));
static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid script regex")
});
static SCRIPT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?script\b[^>]*>").expect("valid script tag regex"));
static JS_URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)javascript\s*:").expect("valid uri regex"));
static START_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[A-Za-z][^>]*>").expect("valid start tag regex"));
static EVENT_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("valid event attribute regex")
});

/// Strips code fences, `<script>` blocks, `javascript:` URIs and inline `on*`
/// handlers, leaving the remaining markup untouched.
pub fn sanitize_html(html: &str) -> String {
    let trimmed = html.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let unwrapped = match FENCED.captures(trimmed) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => trimmed,
    };
    let unwrapped = LANG_PREFIX.replace(unwrapped, "");

    let cleaned = SCRIPT_BLOCK.replace_all(&unwrapped, "");
    let cleaned = SCRIPT_TAG.replace_all(&cleaned, "");
    let cleaned = JS_URI.replace_all(&cleaned, "");
    let cleaned = START_TAG.replace_all(&cleaned, |caps: &Captures| {
        EVENT_ATTR.replace_all(&caps[0], "").into_owned()
    });
    cleaned.trim().to_string()
}
