//! Primary → secondary fallback over two backends.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SlideError;
use crate::llm::{ChatBackend, ChatMessage, CompletionBackend, CompletionOptions, Role};

/// Text produced by a backend, tagged with the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generated {
    pub text: String,
    pub source: String,
}

/// Tries the primary backend and falls back to the secondary on any failure.
///
/// The secondary only exposes plain completion, so chat requests are flattened to
/// the content of the last user message before falling back.
#[derive(Clone)]
pub struct FallbackRouter {
    primary: Arc<dyn ChatBackend>,
    secondary: Arc<dyn CompletionBackend>,
}

impl FallbackRouter {
    pub fn new(primary: Arc<dyn ChatBackend>, secondary: Arc<dyn CompletionBackend>) -> Self {
        Self { primary, secondary }
    }

    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    pub fn secondary_name(&self) -> &str {
        self.secondary.name()
    }

    pub async fn generate(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Generated, SlideError> {
        match self.primary.complete(prompt, options).await {
            Ok(text) => Ok(Generated {
                text,
                source: self.primary.name().to_string(),
            }),
            Err(err) => {
                log::warn!(
                    "[FallbackRouter] {} failed, falling back to {}: {}",
                    self.primary.name(),
                    self.secondary.name(),
                    err
                );
                self.fall_back(prompt, options).await
            }
        }
    }

    pub async fn edit(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Generated, SlideError> {
        match self.primary.chat(messages, options).await {
            Ok(text) => Ok(Generated {
                text,
                source: self.primary.name().to_string(),
            }),
            Err(err) => {
                log::warn!(
                    "[FallbackRouter] {} chat edit failed, falling back to {}: {}",
                    self.primary.name(),
                    self.secondary.name(),
                    err
                );
                let prompt = last_user_content(messages).unwrap_or_default();
                self.fall_back(prompt, options).await
            }
        }
    }

    async fn fall_back(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Generated, SlideError> {
        // The primary's model name means nothing to the secondary.
        let options = CompletionOptions {
            model: None,
            ..options.clone()
        };
        self.secondary
            .complete(prompt, &options)
            .await
            .map(|text| Generated {
                text,
                source: self.secondary.name().to_string(),
            })
            .map_err(|source| SlideError::Provider {
                backend: self.secondary.name().to_string(),
                source,
            })
    }
}

fn last_user_content(messages: &[ChatMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
}
