//! Google Gemini LLM client
//!
//! Plain-prompt generation only; used as the secondary backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::{CompletionBackend, CompletionOptions, error::LLMError, retry::RetryPolicy};

/// Configuration for Gemini client
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL (default: https://generativelanguage.googleapis.com)
    pub base_url: String,
    /// Default model (default: gemini-2.5-flash)
    pub default_model: String,
    pub retry: RetryPolicy,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            default_model: "gemini-2.5-flash".to_string(),
            // three attempts, fixed-ish 1.5s spacing
            retry: RetryPolicy::default()
                .with_max_retries(2)
                .with_base_delay(std::time::Duration::from_millis(1500)),
        }
    }
}

/// Request structure for Gemini generate content
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

/// Content structure for Gemini
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// A part of content (text only here)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl GeminiContent {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: Some(text.into()),
            }],
        }
    }
}

/// Generation configuration for Gemini
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

/// HTTP client for the Gemini generateContent API
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a client with an API key and the default base URL
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::new(GeminiConfig {
            api_key: api_key.into(),
            ..Default::default()
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// One generateContent round trip, without retry.
    pub async fn call_gemini(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, LLMError> {
        let model = options
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, model
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent::user(prompt)],
            generation_config: Some(GeminiGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                stop_sequences: options.stop.clone(),
            }),
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.config.api_key.as_str())
            .header("Content-Type", "application/json")
            .json(&request)
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

        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| LLMError::MalformedResponse(format!("Gemini body: {}", e)))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| LLMError::MalformedResponse("No text in Gemini response".to_string()))
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, LLMError> {
        if prompt.is_empty() {
            return Err(LLMError::InvalidRequest(
                "Prompt is required for Gemini generation".to_string(),
            ));
        }
        self.config
            .retry
            .run("Gemini", || self.call_gemini(prompt, options))
            .await
    }
}
