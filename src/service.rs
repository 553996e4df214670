//! Boundary operations used by interactive clients.
//!
//! Every per-slide mutation (edit, revert, lock, unlock) runs inside the
//! [`MutationQueue`] turn for that slide, so the fetch, guard, mutate and persist steps
//! of one operation never interleave with another on the same slide.

use std::sync::Arc;

use futures::stream::BoxStream;
use serde::Serialize;

use crate::branding::BrandContext;
use crate::cache::{CacheStats, SlideCache};
use crate::chunker::chunk_markdown;
use crate::config::EngineConfig;
use crate::diff::{DiffPart, diff_html};
use crate::editor::EditEngine;
use crate::error::{Result, SlideError};
use crate::generation::GenerationEngine;
use crate::llm::FallbackRouter;
use crate::queue::MutationQueue;
use crate::slide::{REVERT_SOURCE, Slide, Version};
use crate::store::{RunId, SlideStore};
use crate::telemetry::{LogTelemetry, Telemetry};

/// Result of a deck generation. Slides are returned even when saving them failed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckOutcome {
    pub run_id: Option<RunId>,
    pub slides: Vec<Slide>,
    #[serde(skip)]
    pub persistence_error: Option<SlideError>,
}

impl DeckOutcome {
    pub fn is_persisted(&self) -> bool {
        self.run_id.is_some()
    }
}

pub struct SlideService {
    store: Arc<dyn SlideStore>,
    queue: MutationQueue,
    cache: Arc<SlideCache>,
    generator: GenerationEngine,
    editor: EditEngine,
}

impl SlideService {
    pub fn new(
        router: FallbackRouter,
        branding: Arc<BrandContext>,
        store: Arc<dyn SlideStore>,
        config: EngineConfig,
    ) -> Self {
        let telemetry = Arc::new(LogTelemetry::new(config.debug_prompts));
        Self::with_telemetry(router, branding, store, config, telemetry)
    }

    pub fn with_telemetry(
        router: FallbackRouter,
        branding: Arc<BrandContext>,
        store: Arc<dyn SlideStore>,
        config: EngineConfig,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        let cache = Arc::new(SlideCache::new(config.cache_ttl));
        let generator = GenerationEngine::new(
            router.clone(),
            cache.clone(),
            branding.clone(),
            telemetry.clone(),
            config.clone(),
        );
        let editor = EditEngine::new(router, cache.clone(), branding, telemetry, config);
        Self {
            store,
            queue: MutationQueue::new(),
            cache,
            generator,
            editor,
        }
    }

    /// Builds a service from `BRANDCONFIG_PATH` and the provider/engine environment.
    #[cfg(feature = "llm")]
    pub fn from_env(store: Arc<dyn SlideStore>) -> Result<Self> {
        let config = EngineConfig::from_env()?;
        let router = crate::config::ProviderSettings::from_env()?.router(&config.model);
        let branding = Arc::new(BrandContext::from_env()?);
        Ok(Self::new(router, branding, store, config))
    }

    /// Chunks, generates and saves a deck. Saved slides carry their run-scoped ids.
    pub async fn generate_deck(&self, input: &str, owner: &str) -> Result<DeckOutcome> {
        let specs = chunk_input(input)?;
        let mut slides = self.generator.generate_all(specs).await?;

        match self.store.create_run(input, &slides, owner).await {
            Ok(run) => {
                for (slide, id) in slides.iter_mut().zip(run.slide_ids) {
                    slide.id = id;
                }
                Ok(DeckOutcome {
                    run_id: Some(run.id),
                    slides,
                    persistence_error: None,
                })
            }
            Err(err) => {
                log::error!(
                    "[SlideService] generated {} slides but saving to {} failed: {}",
                    slides.len(),
                    self.store.name(),
                    err
                );
                Ok(DeckOutcome {
                    run_id: None,
                    slides,
                    persistence_error: Some(err),
                })
            }
        }
    }

    /// Lazily generates slides one by one without saving them.
    pub fn generate_deck_stream(&self, input: &str) -> Result<BoxStream<'static, Result<Slide>>> {
        Ok(self.generator.stream(chunk_input(input)?))
    }

    pub async fn slide(&self, slide_id: &str) -> Result<Slide> {
        self.store
            .fetch_slide_with_history(slide_id)
            .await?
            .ok_or_else(|| SlideError::slide_not_found(slide_id))
    }

    pub async fn versions(&self, slide_id: &str) -> Result<Vec<Version>> {
        Ok(self.slide(slide_id).await?.version_history)
    }

    pub async fn slides_for_run(&self, run_id: RunId) -> Result<Vec<Slide>> {
        let slides = self.store.fetch_slides_by_run(run_id).await?;
        if slides.is_empty() {
            return Err(SlideError::run_not_found(run_id.to_string()));
        }
        Ok(slides)
    }

    pub async fn edit_slide(&self, slide_id: &str, instruction: &str, owner: &str) -> Result<Slide> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(SlideError::Validation("instruction is required".into()));
        }

        self.queue
            .with_lock(slide_id, move || async move {
                let mut slide = self.slide(slide_id).await?;
                slide.ensure_editable()?;
                self.editor.apply_edit(&mut slide, instruction).await?;

                let source = slide.last_source().unwrap_or_default().to_string();
                let version = self
                    .store
                    .persist_edit(slide_id, &slide.current_html, &source, Some(instruction), owner)
                    .await?;
                self.store
                    .save_chat_history(slide_id, &slide.chat_history)
                    .await?;
                log::info!(
                    "[SlideService] {} edited by {} -> version {} ({})",
                    slide_id,
                    owner,
                    version,
                    source
                );
                self.slide(slide_id).await
            })
            .await
    }

    pub async fn revert_slide(
        &self,
        slide_id: &str,
        version_index: Option<i64>,
        owner: &str,
    ) -> Result<Slide> {
        let version_index = version_index
            .ok_or_else(|| SlideError::Validation("versionIndex is required".into()))?;

        self.queue
            .with_lock(slide_id, move || async move {
                let mut slide = self.slide(slide_id).await?;
                slide.revert(version_index)?;

                let instruction = slide
                    .version_history
                    .last()
                    .and_then(|v| v.instruction.clone());
                let version = self
                    .store
                    .persist_edit(
                        slide_id,
                        &slide.current_html,
                        REVERT_SOURCE,
                        instruction.as_deref(),
                        owner,
                    )
                    .await?;
                log::info!(
                    "[SlideService] {} reverted to version {} by {} -> version {}",
                    slide_id,
                    version_index,
                    owner,
                    version
                );
                self.slide(slide_id).await
            })
            .await
    }

    pub async fn lock_slide(&self, slide_id: &str) -> Result<Slide> {
        self.queue
            .with_lock(slide_id, move || async move {
                self.store.lock(slide_id).await?;
                self.slide(slide_id).await
            })
            .await
    }

    pub async fn unlock_slide(&self, slide_id: &str) -> Result<Slide> {
        self.queue
            .with_lock(slide_id, move || async move {
                self.store.unlock(slide_id).await?;
                self.slide(slide_id).await
            })
            .await
    }

    /// Compares two history entries. An index equal to the history length means the
    /// current HTML.
    pub async fn diff_versions(&self, slide_id: &str, from: usize, to: usize) -> Result<Vec<DiffPart>> {
        let slide = self.slide(slide_id).await?;
        let old = html_at(&slide, from)?;
        let new = html_at(&slide, to)?;
        Ok(diff_html(old, new))
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

fn chunk_input(input: &str) -> Result<Vec<Slide>> {
    let specs = chunk_markdown(input);
    if specs.is_empty() {
        return Err(SlideError::Validation("markdown input is empty".into()));
    }
    Ok(specs)
}

fn html_at(slide: &Slide, index: usize) -> Result<&str> {
    let len = slide.version_history.len();
    match slide.version_history.get(index) {
        Some(version) => Ok(&version.html),
        None if index == len => Ok(&slide.current_html),
        None => Err(SlideError::VersionOutOfRange {
            index: i64::try_from(index).unwrap_or(i64::MAX),
            len,
        }),
    }
}
