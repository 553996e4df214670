//! Splits a markdown document into per-slide specs on `---` separator lines.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::key::sha256_hex;
use crate::slide::Slide;

pub const UNTITLED: &str = "Untitled Slide";

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#{1,3}\s*(.+)$").expect("valid heading regex"));

/// One unsaved slide per non-empty section, titled by its first heading.
///
/// Ids are derived from section content; repeated sections get a numeric suffix so
/// ids stay unique within a deck.
pub fn chunk_markdown(full_markdown: &str) -> Vec<Slide> {
    let normalized = full_markdown.replace("\r\n", "\n");
    let mut seen: HashMap<String, usize> = HashMap::new();

    normalized
        .split("\n---\n")
        .map(str::trim)
        .filter(|section| !section.is_empty())
        .map(|section| {
            let base = format!("slide-{}", &sha256_hex(section)[..8]);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            let id = if *count == 1 {
                base
            } else {
                format!("{}-{}", base, count)
            };
            Slide::new(id, title_of(section), section)
        })
        .collect()
}

fn title_of(section: &str) -> String {
    HEADING
        .captures(section)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_separator() {
        let md = "## Slide One\nContent\n\n---\n\n## Slide Two\nMore";
        let slides = chunk_markdown(md);
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].title, "Slide One");
        assert_eq!(slides[0].original_markdown, "## Slide One\nContent");
        assert_eq!(slides[1].title, "Slide Two");
        assert!(slides.iter().all(|s| s.current_html.is_empty()));
        assert!(slides.iter().all(|s| s.version_history.is_empty()));
    }

    #[test]
    fn test_title_fallback_and_deep_headings() {
        let slides = chunk_markdown("Just text\n---\n#### Deep");
        assert_eq!(slides[0].title, UNTITLED);
        assert_eq!(slides[1].title, "# Deep");
    }

    #[test]
    fn test_ids_are_stable_and_unique() {
        let first = chunk_markdown("## A\nx\n---\n## B\ny");
        let second = chunk_markdown("## A\nx\n---\n## B\ny");
        assert_eq!(first[0].id, second[0].id);
        assert!(first[0].id.starts_with("slide-"));
        assert_eq!(first[0].id.len(), "slide-".len() + 8);

        let repeated = chunk_markdown("## A\n---\n## A");
        assert_eq!(repeated.len(), 2);
        assert_ne!(repeated[0].id, repeated[1].id);
        assert!(repeated[1].id.ends_with("-2"));
    }

    #[test]
    fn test_crlf_and_empty_sections() {
        let slides = chunk_markdown("## A\r\nx\r\n---\r\n\n---\n## B");
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[1].title, "B");
    }
}
