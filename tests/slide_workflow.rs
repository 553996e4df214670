//! End-to-end slide lifecycle through `SlideService` with scripted backends.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use slidecraft::error::ErrorClass;
use slidecraft::prelude::*;
use slidecraft::store::{EditAction, RunId, RunRecord};
use slidecraft::{MemoryTelemetry, Telemetry};

const OWNER: &str = "owner-1";
const DECK: &str = "## Welcome\nHello there\n---\n## Scope\n- Item one\n- Item two\n---\n## Team";

/// Numbered outputs so every model call is distinguishable.
#[derive(Default)]
struct Scripted {
    completions: AtomicUsize,
    chats: AtomicUsize,
    down: AtomicBool,
}

impl Scripted {
    fn check(&self) -> Result<(), LLMError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(LLMError::Status {
                status: 503,
                body: "down".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CompletionBackend for Scripted {
    fn name(&self) -> &str {
        "together"
    }

    async fn complete(&self, prompt: &str, _: &CompletionOptions) -> Result<String, LLMError> {
        self.check()?;
        if prompt.contains("conversation summarizer") {
            return Ok("- Earlier edits were applied.".to_string());
        }
        let n = self.completions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("```html\n<section><h1>slide {}</h1></section>\n```", n))
    }
}

#[async_trait]
impl ChatBackend for Scripted {
    async fn chat(&self, _: &[ChatMessage], _: &CompletionOptions) -> Result<String, LLMError> {
        self.check()?;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let n = self.chats.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("<section><h1>edit {}</h1><script>x()</script></section>", n))
    }
}

/// Secondary that is always unavailable.
struct Offline;

#[async_trait]
impl CompletionBackend for Offline {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, _: &str, _: &CompletionOptions) -> Result<String, LLMError> {
        Err(LLMError::Status {
            status: 503,
            body: "offline".into(),
        })
    }
}

fn branding() -> Arc<BrandContext> {
    let raw = json!({
        "brandName": "Acme",
        "tagline": "Commerce, simplified",
        "palette": {
            "digitalTide": "#0A7C8C",
            "retailStone": "#B8B2A7",
            "cloudCommerce": "#E6F0F2",
            "midnightTrade": "#10242B",
            "checkoutGold": "#F2B705"
        },
        "fonts": { "primary": "Inter", "websafe": "Arial" },
        "logoPaths": { "singleLogo": "logo.svg", "allLogos": "logos/" },
        "imagery": {
            "brandGuidePdf": "guide.pdf",
            "colourPalette": "palette.png",
            "photoStyle": "photo.png",
            "coreElements": "core.png",
            "powerpointExample": "example.pptx",
            "stockDir": "stock/",
            "headshotsDir": "headshots/"
        },
        "stakeholders": [
            { "name": "Ada", "title": "CTO", "email": "ada@acme.test", "imagePath": "ada.png" }
        ]
    });
    Arc::new(BrandContext::from_json(&raw.to_string()).unwrap())
}

struct Harness {
    service: SlideService,
    store: Arc<MemoryStore>,
    backend: Arc<Scripted>,
    telemetry: Arc<MemoryTelemetry>,
}

fn harness() -> Harness {
    let backend = Arc::new(Scripted::default());
    let store = Arc::new(MemoryStore::new());
    let telemetry = Arc::new(MemoryTelemetry::new());
    let service = SlideService::with_telemetry(
        FallbackRouter::new(backend.clone(), Arc::new(Offline)),
        branding(),
        store.clone(),
        EngineConfig::default(),
        telemetry.clone() as Arc<dyn Telemetry>,
    );
    Harness {
        service,
        store,
        backend,
        telemetry,
    }
}

async fn first_slide(h: &Harness) -> Slide {
    let outcome = h.service.generate_deck(DECK, OWNER).await.unwrap();
    outcome.slides.into_iter().next().unwrap()
}

#[tokio::test]
async fn generate_deck_persists_a_run() {
    let h = harness();
    let outcome = h.service.generate_deck(DECK, OWNER).await.unwrap();

    assert!(outcome.is_persisted());
    assert!(outcome.persistence_error.is_none());
    assert_eq!(outcome.slides.len(), 3);
    assert_eq!(outcome.slides[2].title, "Team");

    let stored = h
        .service
        .slides_for_run(outcome.run_id.unwrap())
        .await
        .unwrap();
    assert_eq!(stored, outcome.slides);
    for slide in &stored {
        assert_eq!(slide.version_number, 1);
        assert_eq!(slide.version_history[0].source, "together");
        assert!(slide.current_html.starts_with("<section>"));
    }
}

#[tokio::test]
async fn regenerating_same_deck_uses_cache_and_persists_a_new_run() {
    let h = harness();
    let first = h.service.generate_deck(DECK, OWNER).await.unwrap();
    assert_eq!(h.backend.completions.load(Ordering::SeqCst), 3);

    let again = h.service.generate_deck(DECK, OWNER).await.unwrap();
    assert_eq!(h.backend.completions.load(Ordering::SeqCst), 3);
    assert!(again.is_persisted());
    assert_ne!(again.run_id, first.run_id);
    assert_eq!(again.slides.len(), 3);
    assert!(
        again
            .slides
            .iter()
            .all(|s| s.version_history[0].source.starts_with("cache("))
    );
    assert_eq!(h.service.cache_stats().hits, 3);
    assert_eq!(h.store.slide_count(), 6);

    let edited = h
        .service
        .edit_slide(&again.slides[0].id, "make it bold", OWNER)
        .await
        .unwrap();
    assert_eq!(edited.version_number, 2);
    let original = h.service.slide(&first.slides[0].id).await.unwrap();
    assert_eq!(original.version_number, 1);
}

/// Store whose `create_run` always fails.
struct Unsaveable(MemoryStore);

#[async_trait]
impl SlideStore for Unsaveable {
    async fn create_run(&self, _: &str, _: &[Slide], _: &str) -> Result<RunRecord, SlideError> {
        Err(SlideError::Persistence("database unavailable".into()))
    }

    async fn persist_edit(
        &self,
        slide_id: &str,
        html: &str,
        source: &str,
        instruction: Option<&str>,
        owner: &str,
    ) -> Result<usize, SlideError> {
        self.0.persist_edit(slide_id, html, source, instruction, owner).await
    }

    async fn fetch_slide_with_history(&self, slide_id: &str) -> Result<Option<Slide>, SlideError> {
        self.0.fetch_slide_with_history(slide_id).await
    }

    async fn fetch_slides_by_run(&self, run_id: RunId) -> Result<Vec<Slide>, SlideError> {
        self.0.fetch_slides_by_run(run_id).await
    }

    async fn lock(&self, slide_id: &str) -> Result<(), SlideError> {
        self.0.lock(slide_id).await
    }

    async fn unlock(&self, slide_id: &str) -> Result<(), SlideError> {
        self.0.unlock(slide_id).await
    }

    fn name(&self) -> &'static str {
        "unsaveable"
    }
}

#[tokio::test]
async fn save_failure_still_returns_generated_slides() {
    let service = SlideService::new(
        FallbackRouter::new(Arc::new(Scripted::default()), Arc::new(Offline)),
        branding(),
        Arc::new(Unsaveable(MemoryStore::new())),
        EngineConfig::default(),
    );

    let outcome = service.generate_deck(DECK, OWNER).await.unwrap();
    assert!(!outcome.is_persisted());
    assert!(matches!(
        outcome.persistence_error,
        Some(SlideError::Persistence(_))
    ));
    assert_eq!(outcome.slides.len(), 3);
    assert!(outcome.slides.iter().all(|s| s.version_number == 1));
}

#[tokio::test]
async fn empty_input_is_a_validation_error() {
    let h = harness();
    let err = h.service.generate_deck(" \n---\n ", OWNER).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Validation);
}

#[tokio::test]
async fn edits_and_reverts_grow_history_by_one() {
    let h = harness();
    let slide = first_slide(&h).await;
    let original_html = slide.current_html.clone();

    let edited = h
        .service
        .edit_slide(&slide.id, "make the heading blue", OWNER)
        .await
        .unwrap();
    assert_eq!(edited.version_number, 2);
    assert_eq!(edited.current_html, "<section><h1>edit 1</h1></section>");
    assert_eq!(edited.version_history[1].html, original_html);
    assert_eq!(edited.chat_history.len(), 3);

    let edited = h
        .service
        .edit_slide(&slide.id, "add a subtitle", OWNER)
        .await
        .unwrap();
    assert_eq!(edited.version_number, 3);

    let reverted = h
        .service
        .revert_slide(&slide.id, Some(1), OWNER)
        .await
        .unwrap();
    assert_eq!(reverted.version_number, 4);
    assert_eq!(reverted.current_html, original_html);
    let last = reverted.version_history.last().unwrap();
    assert_eq!(last.html, "<section><h1>edit 2</h1></section>");
    assert_eq!(last.source, "revert");
    assert_eq!(last.instruction.as_deref(), Some("Reverted to version 1"));
    assert_eq!(reverted.version_number, reverted.version_history.len());

    let log = h.store.edit_log(&slide.id);
    assert_eq!(
        log.iter().map(|e| e.action).collect::<Vec<_>>(),
        [EditAction::Edit, EditAction::Edit, EditAction::Revert]
    );
    assert_eq!(log[2].to_version, 4);
    assert!(log.iter().all(|e| e.owner_id == OWNER));
}

#[tokio::test]
async fn locked_slides_reject_mutations() {
    let h = harness();
    let slide = first_slide(&h).await;

    let locked = h.service.lock_slide(&slide.id).await.unwrap();
    assert!(locked.is_locked);
    assert!(locked.finalized_at.is_some());

    let err = h
        .service
        .edit_slide(&slide.id, "make it red", OWNER)
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::LockedConflict);
    assert_eq!(
        serde_json::to_value(err.to_body()).unwrap()["class"],
        "locked-conflict"
    );

    let err = h
        .service
        .revert_slide(&slide.id, Some(0), OWNER)
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::LockedConflict);

    let unchanged = h.service.slide(&slide.id).await.unwrap();
    assert_eq!(unchanged.version_number, 1);
    assert_eq!(unchanged.current_html, slide.current_html);
    assert_eq!(h.backend.chats.load(Ordering::SeqCst), 0);

    let unlocked = h.service.unlock_slide(&slide.id).await.unwrap();
    assert!(!unlocked.is_locked);
    assert!(unlocked.finalized_at.is_none());
    let edited = h
        .service
        .edit_slide(&slide.id, "make it red", OWNER)
        .await
        .unwrap();
    assert_eq!(edited.version_number, 2);
}

#[tokio::test]
async fn concurrent_edits_on_one_slide_apply_in_order() {
    let h = harness();
    let slide = first_slide(&h).await;

    let (a, b, c) = tokio::join!(
        h.service.edit_slide(&slide.id, "first", OWNER),
        h.service.edit_slide(&slide.id, "second", OWNER),
        h.service.edit_slide(&slide.id, "third", OWNER),
    );
    assert_eq!(a.unwrap().version_number, 2);
    assert_eq!(b.unwrap().version_number, 3);
    assert_eq!(c.unwrap().version_number, 4);

    let slide = h.service.slide(&slide.id).await.unwrap();
    let instructions: Vec<_> = slide
        .version_history
        .iter()
        .filter_map(|v| v.instruction.as_deref())
        .collect();
    assert_eq!(instructions, ["first", "second", "third"]);
    assert_eq!(slide.current_html, "<section><h1>edit 3</h1></section>");
}

#[tokio::test]
async fn lock_waits_for_in_flight_edit() {
    let h = harness();
    let slide = first_slide(&h).await;

    let (edited, locked, late) = tokio::join!(
        h.service.edit_slide(&slide.id, "make it bold", OWNER),
        h.service.lock_slide(&slide.id),
        h.service.edit_slide(&slide.id, "make it italic", OWNER),
    );

    assert_eq!(edited.unwrap().version_number, 2);
    let locked = locked.unwrap();
    assert!(locked.is_locked);
    assert_eq!(locked.version_number, 2);
    assert_eq!(late.unwrap_err().class(), ErrorClass::LockedConflict);

    let stored = h.service.slide(&slide.id).await.unwrap();
    assert_eq!(stored.version_number, 2);
    assert_eq!(stored.current_html, "<section><h1>edit 1</h1></section>");
    assert_eq!(h.backend.chats.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn long_conversations_are_condensed() {
    let h = harness();
    let slide = first_slide(&h).await;

    for i in 1..=5 {
        h.service
            .edit_slide(&slide.id, &format!("change number {}", i), OWNER)
            .await
            .unwrap();
    }

    let slide = h.service.slide(&slide.id).await.unwrap();
    assert_eq!(slide.version_number, 6);
    assert_eq!(slide.chat_history.len(), 5);
    assert_eq!(slide.chat_history[0].role, Role::System);
    assert!(
        slide.chat_history[0]
            .content
            .starts_with("Summary of earlier edits:\n- ")
    );
    assert_eq!(slide.chat_history[3].content, "change number 5");
}

#[tokio::test]
async fn provider_outage_leaves_slide_untouched() {
    let h = harness();
    let slide = first_slide(&h).await;
    h.backend.down.store(true, Ordering::SeqCst);

    let err = h
        .service
        .edit_slide(&slide.id, "make it green", OWNER)
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Internal);
    assert!(err.to_string().contains("gemini"));

    let stored = h.service.slide(&slide.id).await.unwrap();
    assert_eq!(stored, slide);
    assert!(h.store.edit_log(&slide.id).is_empty());
}

#[tokio::test]
async fn request_validation_and_missing_slides() {
    let h = harness();
    let slide = first_slide(&h).await;

    let err = h.service.edit_slide(&slide.id, "   ", OWNER).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Validation);

    let err = h.service.revert_slide(&slide.id, None, OWNER).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Validation);

    let err = h
        .service
        .revert_slide(&slide.id, Some(5), OWNER)
        .await
        .unwrap_err();
    assert!(matches!(err, SlideError::VersionOutOfRange { index: 5, len: 1 }));

    let err = h
        .service
        .edit_slide("slide-missing", "bigger", OWNER)
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);

    let err = h
        .service
        .slides_for_run(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
async fn stream_generates_lazily() {
    let h = harness();
    let mut stream = h.service.generate_deck_stream(DECK).unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.title, "Welcome");
    assert_eq!(h.backend.completions.load(Ordering::SeqCst), 1);

    let rest: Vec<_> = stream.collect().await;
    assert_eq!(rest.len(), 2);
    assert_eq!(h.backend.completions.load(Ordering::SeqCst), 3);
    assert_eq!(h.store.slide_count(), 0);
}

#[tokio::test]
async fn diff_between_versions() {
    let h = harness();
    let slide = first_slide(&h).await;
    let edited = h
        .service
        .edit_slide(&slide.id, "rename", OWNER)
        .await
        .unwrap();

    let parts = h
        .service
        .diff_versions(&slide.id, 1, edited.version_history.len())
        .await
        .unwrap();
    assert!(parts.iter().any(|p| p.added && p.value.contains("edit")));
    assert!(parts.iter().any(|p| p.removed && p.value.contains("slide")));

    let err = h.service.diff_versions(&slide.id, 0, 9).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Validation);
}

#[tokio::test]
async fn clearing_cache_forces_new_generation() {
    let h = harness();
    h.service.generate_deck_stream("## Solo").unwrap().collect::<Vec<_>>().await;
    h.service.clear_cache();
    h.service.generate_deck_stream("## Solo").unwrap().collect::<Vec<_>>().await;

    assert_eq!(h.backend.completions.load(Ordering::SeqCst), 2);
    assert_eq!(h.telemetry.usage().len(), 2);
}
