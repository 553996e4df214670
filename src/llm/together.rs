//! Together.ai LLM client
//!
//! Together exposes an OpenAI-compatible API with separate endpoints for plain
//! completions and multi-turn chat. It is the primary backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::{
    ChatBackend, ChatMessage, CompletionBackend, CompletionOptions, error::LLMError,
    retry::RetryPolicy,
};

pub const DEFAULT_MODEL: &str = "Qwen/Qwen2.5-Coder-32B-Instruct";

/// Configuration for the Together client
#[derive(Clone, Debug)]
pub struct TogetherConfig {
    /// API key for bearer authentication
    pub api_key: String,
    /// Base URL (default: https://api.together.ai)
    pub base_url: String,
    /// Default model to use (default: Qwen/Qwen2.5-Coder-32B-Instruct)
    pub default_model: String,
    pub default_max_tokens: u32,
    pub default_temperature: f32,
    pub retry: RetryPolicy,
}

impl Default for TogetherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.together.ai".to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_max_tokens: 1500,
            default_temperature: 0.7,
            retry: RetryPolicy::default(),
        }
    }
}

/// Request body for `/v1/completions`
#[derive(Debug, Serialize)]
pub struct TogetherCompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<&'a [String]>,
}

/// Request body for `/v1/chat/completions`
#[derive(Debug, Serialize)]
pub struct TogetherChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<&'a [String]>,
    pub stream: bool,
}

// Responses are decoded leniently so a 2xx body without the expected
// structure surfaces as `MalformedResponse` instead of a decode error.

#[derive(Debug, Deserialize)]
struct TogetherCompletionResponse {
    #[serde(default)]
    choices: Vec<TogetherCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct TogetherCompletionChoice {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TogetherChatResponse {
    #[serde(default)]
    choices: Vec<TogetherChatChoice>,
}

#[derive(Debug, Deserialize)]
struct TogetherChatChoice {
    #[serde(default)]
    message: Option<TogetherResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct TogetherResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for Together.ai
#[derive(Clone)]
pub struct TogetherClient {
    client: reqwest::Client,
    config: TogetherConfig,
}

impl TogetherClient {
    pub fn new(config: TogetherConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a client with an API key and the default base URL
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::new(TogetherConfig {
            api_key: api_key.into(),
            ..Default::default()
        })
    }

    pub fn config(&self) -> &TogetherConfig {
        &self.config
    }

    /// One `/v1/completions` round trip, without retry.
    pub async fn call_completion(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, LLMError> {
        let request = TogetherCompletionRequest {
            model: options
                .model
                .as_deref()
                .unwrap_or(&self.config.default_model),
            prompt,
            max_tokens: options.max_tokens.unwrap_or(self.config.default_max_tokens),
            temperature: options
                .temperature
                .unwrap_or(self.config.default_temperature),
            stop: options.stop.as_deref(),
        };

        let body = self.post("/v1/completions", &request).await?;
        let parsed: TogetherCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            LLMError::MalformedResponse(format!("Together completion body: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.text)
            .ok_or_else(|| {
                LLMError::MalformedResponse("Malformed Together.ai completion response".to_string())
            })
    }

    /// One `/v1/chat/completions` round trip, without retry.
    pub async fn call_chat_completion(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LLMError> {
        let request = TogetherChatRequest {
            model: options
                .model
                .as_deref()
                .unwrap_or(&self.config.default_model),
            messages,
            max_tokens: options.max_tokens.unwrap_or(self.config.default_max_tokens),
            temperature: options
                .temperature
                .unwrap_or(self.config.default_temperature),
            stop: options.stop.as_deref(),
            stream: false,
        };

        let body = self.post("/v1/chat/completions", &request).await?;
        let parsed: TogetherChatResponse = serde_json::from_str(&body)
            .map_err(|e| LLMError::MalformedResponse(format!("Together chat body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                LLMError::MalformedResponse("Malformed Together.ai chat response".to_string())
            })
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String, LLMError> {
        let response = self
            .client
            .post(format!("{}{}", self.config.base_url, path))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(LLMError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl CompletionBackend for TogetherClient {
    fn name(&self) -> &str {
        "together"
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, LLMError> {
        if prompt.is_empty() {
            return Err(LLMError::InvalidRequest(
                "Prompt is required for completion".to_string(),
            ));
        }
        self.config
            .retry
            .run("TogetherClient", || self.call_completion(prompt, options))
            .await
    }
}

#[async_trait]
impl ChatBackend for TogetherClient {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, LLMError> {
        if messages.is_empty() {
            return Err(LLMError::InvalidRequest(
                "Messages array required for chat completion".to_string(),
            ));
        }
        self.config
            .retry
            .run("TogetherClient", || {
                self.call_chat_completion(messages, options)
            })
            .await
    }
}
