//! Engine configuration, from code or from the environment.

use std::time::Duration;

use crate::cache::DEFAULT_TTL;
use crate::error::{Result, SlideError};

pub const DEFAULT_CONDENSE_THRESHOLD: usize = 8;
pub const DEFAULT_TOGETHER_BASE: &str = "https://api.together.ai";
pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Knobs shared by the generation and edit engines.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Model named in cache fingerprints and sent to the primary backend
    pub model: String,
    pub cache_ttl: Duration,
    /// Chat histories longer than this are condensed before an edit
    pub condense_threshold: usize,
    /// Log full prompts instead of their hashes
    pub debug_prompts: bool,
    pub generation_max_tokens: u32,
    pub summary_max_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "Qwen/Qwen2.5-Coder-32B-Instruct".to_string(),
            cache_ttl: DEFAULT_TTL,
            condense_threshold: DEFAULT_CONDENSE_THRESHOLD,
            debug_prompts: false,
            generation_max_tokens: 1500,
            summary_max_tokens: 250,
        }
    }
}

impl EngineConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_condense_threshold(mut self, threshold: usize) -> Self {
        self.condense_threshold = threshold;
        self
    }

    pub fn with_debug_prompts(mut self, enabled: bool) -> Self {
        self.debug_prompts = enabled;
        self
    }

    /// Reads `TOGETHER_MODEL`, `SLIDE_CACHE_TTL_SECS`, `CHAT_CONDENSE_THRESHOLD` and
    /// `DEBUG_PROMPTS`, keeping defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(model) = lookup("TOGETHER_MODEL") {
            config.model = model;
        }
        if let Some(ttl) = lookup("SLIDE_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(parse_number("SLIDE_CACHE_TTL_SECS", &ttl)?);
        }
        if let Some(threshold) = lookup("CHAT_CONDENSE_THRESHOLD") {
            config.condense_threshold = parse_number("CHAT_CONDENSE_THRESHOLD", &threshold)?;
        }
        config.debug_prompts = lookup("DEBUG_PROMPTS").is_some_and(|v| v == "true");
        Ok(config)
    }
}

/// Credentials and endpoints for both backends.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub together_api_key: String,
    pub together_base: String,
    pub gemini_api_key: String,
    pub gemini_base: String,
    pub gemini_model: String,
}

impl ProviderSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// `GEMINI_API_KEY` is required; `TOGETHER_API_KEY` defaults to `test`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let gemini_api_key = lookup("GEMINI_API_KEY")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| SlideError::Config("Missing GEMINI_API_KEY in environment".into()))?;
        Ok(Self {
            together_api_key: lookup("TOGETHER_API_KEY").unwrap_or_else(|| "test".to_string()),
            together_base: lookup("TOGETHER_API_BASE")
                .unwrap_or_else(|| DEFAULT_TOGETHER_BASE.to_string()),
            gemini_api_key,
            gemini_base: lookup("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_GEMINI_BASE.to_string()),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        })
    }
}

#[cfg(feature = "llm")]
impl ProviderSettings {
    /// Together as primary (serving `model`), Gemini as secondary.
    pub fn router(&self, model: &str) -> crate::llm::FallbackRouter {
        use crate::llm::{GeminiClient, GeminiConfig, TogetherClient, TogetherConfig};
        use std::sync::Arc;

        let primary = TogetherClient::new(TogetherConfig {
            api_key: self.together_api_key.clone(),
            base_url: self.together_base.clone(),
            default_model: model.to_string(),
            ..Default::default()
        });
        let secondary = GeminiClient::new(GeminiConfig {
            api_key: self.gemini_api_key.clone(),
            base_url: self.gemini_base.clone(),
            default_model: self.gemini_model.clone(),
            ..Default::default()
        });
        crate::llm::FallbackRouter::new(Arc::new(primary), Arc::new(secondary))
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| SlideError::Config(format!("{} must be a non-negative integer, got {:?}", name, raw)))
}
