//! LLM backends for slidecraft
//!
//! Backends implement [`CompletionBackend`] (plain prompt) and optionally [`ChatBackend`]
//! (multi-turn). The HTTP clients are gated behind the `llm` feature; the traits, retry
//! policy and [`FallbackRouter`] are always available so engines can run against any
//! implementation.

pub mod error;
pub mod retry;
pub mod router;

#[cfg(feature = "llm")]
pub mod gemini;
#[cfg(feature = "llm")]
pub mod together;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::LLMError;
pub use retry::RetryPolicy;
pub use router::{FallbackRouter, Generated};

#[cfg(feature = "llm")]
pub use gemini::{GeminiClient, GeminiConfig};
#[cfg(feature = "llm")]
pub use together::{TogetherClient, TogetherConfig};

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single turn sent to a chat backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call generation knobs. Unset fields fall back to the backend's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub stop: Option<Vec<String>>,
}

impl CompletionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model for this call (overrides default)
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the maximum number of tokens to generate
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set stop sequences
    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }
}

/// A backend that turns a flat prompt into text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Provenance tag recorded on every output produced by this backend.
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str, options: &CompletionOptions)
    -> Result<String, LLMError>;
}

/// A backend that additionally accepts a multi-turn conversation.
#[async_trait]
pub trait ChatBackend: CompletionBackend {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LLMError>;
}
