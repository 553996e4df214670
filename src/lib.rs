//! # Slidecraft
//!
//! Turns a markdown document into an HTML slide deck with an LLM, then lets users
//! refine each slide with natural-language instructions.
//!
//! ## Features
//!
//! - **Fallback Generation**: A primary chat backend with retries and timeouts, backed by a secondary
//! - **Content Cache**: Identical requests are fingerprinted and answered without a model call
//! - **Editing Conversations**: Per-slide chat history, condensed once it grows long
//! - **Version History**: Every mutation is recorded; any version can be restored
//! - **Serialized Mutations**: Edits, reverts and locks on one slide never interleave
//! - **Optional HTTP Backends**: Together and Gemini clients (feature-gated behind `llm`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slidecraft::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SlideError> {
//!     let service = SlideService::from_env(Arc::new(MemoryStore::new()))?;
//!
//!     let deck = service
//!         .generate_deck("## Intro\nHello\n---\n## Scope\n- Item", "owner-1")
//!         .await?;
//!     let first = &deck.slides[0];
//!
//!     let edited = service
//!         .edit_slide(&first.id, "make the heading blue", "owner-1")
//!         .await?;
//!     service.revert_slide(&edited.id, Some(0), "owner-1").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`llm`]: Backend traits, retry policy, fallback router and HTTP clients
//! - [`cache`]: Fingerprinted HTML cache with TTL
//! - [`generation`] / [`editor`]: First-pass generation and instruction edits
//! - [`queue`]: Per-slide mutation ordering
//! - [`store`]: Persistence contract and the in-memory store
//! - [`service`]: The operations exposed to interactive clients
//! - [`prelude`]: Commonly used types (import with `use slidecraft::prelude::*`)

// ============================================================================
// Modules
// ============================================================================

pub mod branding;
pub mod cache;
pub mod chunker;
pub mod config;
pub mod diff;
pub mod editor;
pub mod error;
pub mod generation;
pub mod llm;
pub mod queue;
pub mod sanitize;
pub mod service;
pub mod slide;
pub mod store;
pub mod telemetry;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use branding::BrandContext;
pub use cache::{CacheEntry, CacheKey, CacheMetadata, CacheStats, Fingerprint, SlideCache};
pub use chunker::chunk_markdown;
pub use config::{EngineConfig, ProviderSettings};
pub use diff::{DiffPart, diff_html};
pub use editor::EditEngine;
pub use error::{ErrorBody, ErrorClass, Result, SlideError};
pub use generation::GenerationEngine;
pub use llm::{
    ChatBackend, ChatMessage, CompletionBackend, CompletionOptions, FallbackRouter, Generated,
    LLMError, RetryPolicy, Role,
};
pub use queue::MutationQueue;
pub use sanitize::sanitize_html;
pub use service::{DeckOutcome, SlideService};
pub use slide::{Message, Slide, Version};
pub use store::{EditLogEntry, MemoryStore, RunId, RunRecord, SlideStore};
pub use telemetry::{LogTelemetry, MemoryTelemetry, Telemetry};

#[cfg(feature = "llm")]
pub use llm::{GeminiClient, GeminiConfig, TogetherClient, TogetherConfig};

// ============================================================================
// Prelude
// ============================================================================

/// Everything needed to run the service end to end.
///
/// # Example
/// ```rust
/// use slidecraft::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        BrandContext, ChatBackend, ChatMessage, CompletionBackend, CompletionOptions,
        DeckOutcome, EngineConfig, FallbackRouter, LLMError, MemoryStore, Role, Slide,
        SlideError, SlideService, SlideStore, Version,
    };
}

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
