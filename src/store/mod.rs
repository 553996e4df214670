//! Persistence contract for runs, slides and their edit log.
//!
//! Implementations must make each call all-or-nothing: a failed `create_run` leaves no
//! run or slide behind and a failed `persist_edit` leaves the slide as it was.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::slide::{Message, Slide};

pub use memory::MemoryStore;

pub type RunId = Uuid;

/// Persisted id of a chunked slide. Chunk ids repeat across decks built from the same
/// sections; the run id keeps stored ids unique.
pub fn run_scoped_id(run_id: RunId, chunk_id: &str) -> String {
    format!("{}-{}", chunk_id, run_id.simple())
}

/// Kind of a persisted slide mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditAction {
    Edit,
    Revert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditLogEntry {
    pub slide_id: String,
    pub owner_id: String,
    pub action: EditAction,
    pub instruction: Option<String>,
    pub from_version: usize,
    pub to_version: usize,
    pub at: DateTime<Utc>,
}

/// One generation request and the slides it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: RunId,
    pub input_markdown: String,
    pub owner_id: String,
    pub slide_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait SlideStore: Send + Sync {
    /// Stores the run and every slide in it under a fresh run id.
    ///
    /// `slide_ids` of the returned record are the persisted ids, in deck order.
    async fn create_run(&self, input: &str, slides: &[Slide], owner: &str) -> Result<RunRecord>;

    /// Records `html` as the slide's new content and returns the new version number.
    async fn persist_edit(
        &self,
        slide_id: &str,
        html: &str,
        source: &str,
        instruction: Option<&str>,
        owner: &str,
    ) -> Result<usize>;

    async fn fetch_slide_with_history(&self, slide_id: &str) -> Result<Option<Slide>>;

    /// Slides of a run in deck order.
    async fn fetch_slides_by_run(&self, run_id: RunId) -> Result<Vec<Slide>>;

    async fn lock(&self, slide_id: &str) -> Result<()>;

    async fn unlock(&self, slide_id: &str) -> Result<()>;

    /// Stores without chat history may ignore this.
    async fn save_chat_history(&self, _slide_id: &str, _messages: &[Message]) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}
