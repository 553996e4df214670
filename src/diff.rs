//! Token-level comparison of two HTML versions.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+|\S+").expect("valid token regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffPart {
    pub value: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub added: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub removed: bool,
}

impl DiffPart {
    fn same(value: &str) -> Self {
        Self {
            value: value.to_string(),
            added: false,
            removed: false,
        }
    }

    fn added(value: &str) -> Self {
        Self {
            added: true,
            ..Self::same(value)
        }
    }

    fn removed(value: &str) -> Self {
        Self {
            removed: true,
            ..Self::same(value)
        }
    }
}

/// Compares whitespace and non-whitespace runs position by position.
///
/// A mismatch at one position yields the new token (added) followed by the old one
/// (removed). Leftover tokens on either side are reported as added or removed.
pub fn diff_html(old: &str, new: &str) -> Vec<DiffPart> {
    let old: Vec<&str> = TOKEN.find_iter(old).map(|m| m.as_str()).collect();
    let new: Vec<&str> = TOKEN.find_iter(new).map(|m| m.as_str()).collect();

    let mut parts = Vec::with_capacity(old.len().max(new.len()) * 2);
    for (before, after) in old.iter().zip(&new) {
        if before == after {
            parts.push(DiffPart::same(after));
        } else {
            parts.push(DiffPart::added(after));
            parts.push(DiffPart::removed(before));
        }
    }

    let common = old.len().min(new.len());
    parts.extend(new[common..].iter().map(|t| DiffPart::added(t)));
    parts.extend(old[common..].iter().map(|t| DiffPart::removed(t)));
    parts
}
