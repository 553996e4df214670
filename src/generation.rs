//! First-pass HTML generation for chunked slides.
//!
//! [`GenerationEngine::stream`] is the incremental mode: a lazy stream that produces
//! one slide per poll cycle and stops as soon as it is dropped.
//! [`GenerationEngine::generate_all`] is the batch mode and simply collects that stream,
//! so caching, sanitization and telemetry are identical in both.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::branding::BrandContext;
use crate::cache::key::sha256_hex;
use crate::cache::{CacheMetadata, Fingerprint, SlideCache};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::llm::{CompletionOptions, FallbackRouter, Role};
use crate::sanitize::sanitize_html;
use crate::slide::Slide;
use crate::telemetry::{CacheEvent, CacheOp, Telemetry, UsageEvent};

/// Prompt asking for a single Tailwind-styled HTML slide in the brand's style.
pub fn build_slide_prompt(slide_markdown: &str, brand: &BrandContext) -> String {
    format!(
        "You are a professional presentation designer. Convert the following Markdown content into a single HTML slide.\n\
Use Tailwind CSS utility classes for clean, modern styling consistent with the brand.\n\
Output only the HTML snippet. Do not include explanations or markdown.\n\
\n\
Branding:\n\
- Brand Name: {brand_name}\n\
- Tagline: {tagline}\n\
- Primary font: {primary} (fallback: {websafe})\n\
- Primary color: {color}\n\
- Use responsive layout and semantic HTML.\n\
\n\
Requirements:\n\
* Headings should be prominent using Tailwind classes (e.g., text-2xl font-bold, mb-4).\n\
* Lists should be styled with appropriate spacing and custom bullets.\n\
* Include spacing between sections (e.g., use mb-6, p-4).\n\
* If the slide contains stakeholder information, format it as a responsive grid.\n\
* Avoid inline scripts. Only use Tailwind utility classes.\n\
* Keep markup minimal but visually clear.\n\
\n\
Slide content:\n\
{markdown}\n",
        brand_name = brand.brand_name,
        tagline = brand.tagline,
        primary = brand.fonts.primary,
        websafe = brand.fonts.websafe,
        color = brand.palette.digital_tide,
        markdown = slide_markdown,
    )
}

#[derive(Clone)]
pub struct GenerationEngine {
    router: FallbackRouter,
    cache: Arc<SlideCache>,
    branding: Arc<BrandContext>,
    telemetry: Arc<dyn Telemetry>,
    config: EngineConfig,
}

impl GenerationEngine {
    pub fn new(
        router: FallbackRouter,
        cache: Arc<SlideCache>,
        branding: Arc<BrandContext>,
        telemetry: Arc<dyn Telemetry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            router,
            cache,
            branding,
            telemetry,
            config,
        }
    }

    /// Generates HTML for one slide in place, from cache when possible.
    pub async fn generate_slide(&self, slide: &mut Slide) -> Result<()> {
        let model = self.config.model.as_str();
        let key = Fingerprint::new(&slide.original_markdown, &self.branding, model).key();

        if let Some(entry) = self.cache.get(&key) {
            slide.record_mutation(entry.html.clone(), entry.source_tag(), None);
            slide.push_message(Role::Assistant, entry.html);
            self.telemetry.record_cache(CacheEvent {
                op: CacheOp::Generate,
                hit: true,
            });
            return Ok(());
        }

        let prompt = build_slide_prompt(&slide.original_markdown, &self.branding);
        let options = CompletionOptions::new()
            .model(model)
            .max_tokens(self.config.generation_max_tokens);

        let start = Instant::now();
        let generated = self.router.generate(&prompt, &options).await?;
        let duration = start.elapsed();

        let html = sanitize_html(&generated.text);
        slide.record_mutation(html.clone(), generated.source.clone(), None);
        slide.push_message(Role::Assistant, html.clone());

        self.telemetry.record_usage(UsageEvent {
            prompt: prompt.clone(),
            source: generated.source.clone(),
            duration,
            output_length: generated.text.len(),
        });
        self.telemetry.record_cache(CacheEvent {
            op: CacheOp::Generate,
            hit: false,
        });

        self.cache.set(
            key,
            html,
            CacheMetadata {
                source: generated.source,
                prompt_hash: sha256_hex(&prompt),
                branding_snapshot: self.branding.fingerprint_value(),
            },
        );
        Ok(())
    }

    /// Yields each slide as soon as its HTML is ready. The first error ends the stream.
    pub fn stream(&self, slides: Vec<Slide>) -> BoxStream<'static, Result<Slide>> {
        let state = (self.clone(), slides.into_iter(), false);
        stream::unfold(state, |(engine, mut pending, failed)| async move {
            if failed {
                return None;
            }
            let mut slide = pending.next()?;
            let result = engine.generate_slide(&mut slide).await.map(|()| slide);
            let failed = result.is_err();
            Some((result, (engine, pending, failed)))
        })
        .boxed()
    }

    /// Generates every slide before returning.
    pub async fn generate_all(&self, slides: Vec<Slide>) -> Result<Vec<Slide>> {
        self.stream(slides).try_collect().await
    }
}
