//! Crate-wide error type and its mapping to client-facing classes.

use serde::Serialize;
use thiserror::Error;

use crate::llm::LLMError;

/// Errors surfaced by the slide engine and the service facade.
#[derive(Debug, Error)]
pub enum SlideError {
    #[error("{0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Slide {0} is locked/finalized and cannot be modified")]
    Conflict(String),

    #[error("Invalid version index {index} (history has {len} entries)")]
    VersionOutOfRange { index: i64, len: usize },

    #[error("{backend} failed: {source}")]
    Provider {
        backend: String,
        #[source]
        source: LLMError,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Status class a client uses to pick its messaging without inspecting the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorClass {
    Validation,
    NotFound,
    LockedConflict,
    Internal,
}

impl SlideError {
    pub fn slide_not_found(id: impl Into<String>) -> Self {
        SlideError::NotFound {
            kind: "Slide",
            id: id.into(),
        }
    }

    pub fn run_not_found(id: impl Into<String>) -> Self {
        SlideError::NotFound {
            kind: "Run",
            id: id.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            SlideError::Validation(_) | SlideError::VersionOutOfRange { .. } => {
                ErrorClass::Validation
            }
            SlideError::NotFound { .. } => ErrorClass::NotFound,
            SlideError::Conflict(_) => ErrorClass::LockedConflict,
            SlideError::Provider { .. } | SlideError::Persistence(_) | SlideError::Config(_) => {
                ErrorClass::Internal
            }
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            class: self.class(),
        }
    }
}

/// Structured error payload handed to interactive clients.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub class: ErrorClass,
}

pub type Result<T> = std::result::Result<T, SlideError>;
