//! Errors raised by LLM backends.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LLMError {
    #[cfg(feature = "llm")]
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),
}

impl LLMError {
    /// Whether another attempt against the same backend may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            #[cfg(feature = "llm")]
            LLMError::HttpError(_) => true,
            LLMError::Timeout(_) | LLMError::Status { .. } | LLMError::MalformedResponse(_) => true,
            LLMError::SerializationError(_)
            | LLMError::InvalidRequest(_)
            | LLMError::ProviderNotConfigured(_) => false,
        }
    }
}
