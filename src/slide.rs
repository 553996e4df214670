//! Slide entity, version history and lock state.
//!
//! Every content mutation goes through [`Slide::record_mutation`], which pushes the
//! pre-mutation HTML into the history before overwriting it. History is append-only
//! and `version_number` always equals its length.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlideError};
use crate::llm::Role;

/// Source tag recorded on versions produced by [`Slide::revert`].
pub const REVERT_SOURCE: &str = "revert";

/// A snapshot of the HTML that was current before a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub html: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    #[serde(default)]
    pub instruction: Option<String>,
}

/// One turn of the per-slide editing conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub id: String,
    pub title: String,
    pub original_markdown: String,
    /// Empty until the slide has been generated.
    pub current_html: String,
    pub version_number: usize,
    pub is_locked: bool,
    pub finalized_at: Option<DateTime<Utc>>,
    pub version_history: Vec<Version>,
    pub chat_history: Vec<Message>,
}

impl Slide {
    /// A freshly chunked slide: no HTML, no history, unlocked.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        original_markdown: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            original_markdown: original_markdown.into(),
            current_html: String::new(),
            version_number: 0,
            is_locked: false,
            finalized_at: None,
            version_history: Vec::new(),
            chat_history: Vec::new(),
        }
    }

    /// Pushes the current HTML into history and replaces it with `html`.
    pub fn record_mutation(
        &mut self,
        html: impl Into<String>,
        source: impl Into<String>,
        instruction: Option<String>,
    ) {
        let previous = std::mem::replace(&mut self.current_html, html.into());
        self.version_history.push(Version {
            html: previous,
            timestamp: Utc::now(),
            source: source.into(),
            instruction,
        });
        self.version_number = self.version_history.len();
    }

    pub fn push_message(&mut self, role: Role, content: impl Into<String>) {
        self.chat_history.push(Message::new(role, content));
    }

    /// Conflict if the slide is locked.
    pub fn ensure_editable(&self) -> Result<()> {
        if self.is_locked {
            return Err(SlideError::Conflict(self.id.clone()));
        }
        Ok(())
    }

    /// Restores the HTML of `version_index`, recording the current HTML as a new version.
    pub fn revert(&mut self, version_index: i64) -> Result<()> {
        self.ensure_editable()?;
        let len = self.version_history.len();
        let target = usize::try_from(version_index)
            .ok()
            .and_then(|i| self.version_history.get(i))
            .map(|v| v.html.clone())
            .ok_or(SlideError::VersionOutOfRange {
                index: version_index,
                len,
            })?;

        self.record_mutation(
            target,
            REVERT_SOURCE,
            Some(format!("Reverted to version {}", version_index)),
        );
        Ok(())
    }

    /// Idempotent; the first lock sets `finalized_at`.
    pub fn lock(&mut self) {
        if !self.is_locked {
            self.is_locked = true;
            self.finalized_at = Some(Utc::now());
        }
    }

    pub fn unlock(&mut self) {
        self.is_locked = false;
        self.finalized_at = None;
    }

    pub fn last_source(&self) -> Option<&str> {
        self.version_history.last().map(|v| v.source.as_str())
    }
}
