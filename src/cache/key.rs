//! Cache fingerprints.

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::branding::BrandContext;

/// Instruction recorded for first-pass generation.
pub const INITIAL_INSTRUCTION: &str = "initial";

/// Hex SHA-256 over a canonical request description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Describes one (content, brand, instruction, model) tuple.
#[derive(Debug, Clone, Copy)]
pub struct Fingerprint<'a> {
    pub content: &'a str,
    pub branding: &'a BrandContext,
    pub instruction: Option<&'a str>,
    pub model: &'a str,
}

impl<'a> Fingerprint<'a> {
    pub fn new(content: &'a str, branding: &'a BrandContext, model: &'a str) -> Self {
        Self {
            content,
            branding,
            instruction: None,
            model,
        }
    }

    pub fn instruction(mut self, instruction: &'a str) -> Self {
        self.instruction = Some(instruction);
        self
    }

    pub fn key(&self) -> CacheKey {
        let payload = json!({
            "slideMarkdown": normalize_content(self.content),
            "brandingContext": self.branding.fingerprint_value(),
            "instruction": self.instruction.unwrap_or(INITIAL_INSTRUCTION),
            "model": self.model,
        });
        CacheKey(sha256_hex(&canonical_json(&payload)))
    }
}

/// CRLF folded to LF and outer whitespace trimmed.
pub fn normalize_content(content: &str) -> String {
    content.replace("\r\n", "\n").trim().to_string()
}

/// Serializes `value` with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    sorted(value).to_string()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::new();
            for (key, inner) in entries {
                out.insert(key.clone(), sorted(inner));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
