//! In-memory [`SlideStore`](super::SlideStore).

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{EditAction, EditLogEntry, RunId, RunRecord, SlideStore, run_scoped_id};
use crate::error::{Result, SlideError};
use crate::slide::{Message, REVERT_SOURCE, Slide};

#[derive(Debug, Default)]
struct State {
    slides: HashMap<String, Slide>,
    runs: HashMap<RunId, RunRecord>,
    edit_log: Vec<EditLogEntry>,
}

/// Process-local store. Every call runs under one mutex, which makes each write atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&self, run_id: RunId) -> Option<RunRecord> {
        self.state().runs.get(&run_id).cloned()
    }

    /// Edit log entries for one slide, oldest first.
    pub fn edit_log(&self, slide_id: &str) -> Vec<EditLogEntry> {
        self.state()
            .edit_log
            .iter()
            .filter(|entry| entry.slide_id == slide_id)
            .cloned()
            .collect()
    }

    pub fn slide_count(&self) -> usize {
        self.state().slides.len()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn editable<'a>(state: &'a mut State, slide_id: &str) -> Result<&'a mut Slide> {
    let slide = state
        .slides
        .get_mut(slide_id)
        .ok_or_else(|| SlideError::slide_not_found(slide_id))?;
    slide.ensure_editable()?;
    Ok(slide)
}

#[async_trait]
impl SlideStore for MemoryStore {
    async fn create_run(&self, input: &str, slides: &[Slide], owner: &str) -> Result<RunRecord> {
        let mut state = self.state();
        let run_id = Uuid::new_v4();

        let mut ids = HashSet::new();
        let mut stored = Vec::with_capacity(slides.len());
        for slide in slides {
            let id = run_scoped_id(run_id, &slide.id);
            if !ids.insert(id.clone()) || state.slides.contains_key(&id) {
                return Err(SlideError::Persistence(format!(
                    "slide id {} already exists",
                    slide.id
                )));
            }
            let mut slide = slide.clone();
            slide.id = id;
            stored.push(slide);
        }

        let run = RunRecord {
            id: run_id,
            input_markdown: input.to_string(),
            owner_id: owner.to_string(),
            slide_ids: stored.iter().map(|s| s.id.clone()).collect(),
            created_at: Utc::now(),
        };
        state.runs.insert(run_id, run.clone());
        for slide in stored {
            state.slides.insert(slide.id.clone(), slide);
        }
        log::info!("[MemoryStore] created run {} with {} slides", run_id, slides.len());
        Ok(run)
    }

    async fn persist_edit(
        &self,
        slide_id: &str,
        html: &str,
        source: &str,
        instruction: Option<&str>,
        owner: &str,
    ) -> Result<usize> {
        let mut state = self.state();
        let slide = editable(&mut state, slide_id)?;

        let from_version = slide.version_number;
        slide.record_mutation(html, source, instruction.map(str::to_string));
        let to_version = slide.version_number;

        let action = if source == REVERT_SOURCE {
            EditAction::Revert
        } else {
            EditAction::Edit
        };
        state.edit_log.push(EditLogEntry {
            slide_id: slide_id.to_string(),
            owner_id: owner.to_string(),
            action,
            instruction: instruction.map(str::to_string),
            from_version,
            to_version,
            at: Utc::now(),
        });
        Ok(to_version)
    }

    async fn fetch_slide_with_history(&self, slide_id: &str) -> Result<Option<Slide>> {
        Ok(self.state().slides.get(slide_id).cloned())
    }

    async fn fetch_slides_by_run(&self, run_id: RunId) -> Result<Vec<Slide>> {
        let state = self.state();
        let Some(run) = state.runs.get(&run_id) else {
            return Ok(Vec::new());
        };
        Ok(run
            .slide_ids
            .iter()
            .filter_map(|id| state.slides.get(id).cloned())
            .collect())
    }

    async fn lock(&self, slide_id: &str) -> Result<()> {
        self.state()
            .slides
            .get_mut(slide_id)
            .ok_or_else(|| SlideError::slide_not_found(slide_id))?
            .lock();
        Ok(())
    }

    async fn unlock(&self, slide_id: &str) -> Result<()> {
        self.state()
            .slides
            .get_mut(slide_id)
            .ok_or_else(|| SlideError::slide_not_found(slide_id))?
            .unlock();
        Ok(())
    }

    async fn save_chat_history(&self, slide_id: &str, messages: &[Message]) -> Result<()> {
        let mut state = self.state();
        let slide = state
            .slides
            .get_mut(slide_id)
            .ok_or_else(|| SlideError::slide_not_found(slide_id))?;
        slide.chat_history = messages.to_vec();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
