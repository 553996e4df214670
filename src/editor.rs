//! Instruction-driven slide edits over the chat backend.

use std::sync::Arc;
use std::time::Instant;

use crate::branding::BrandContext;
use crate::cache::key::sha256_hex;
use crate::cache::{CacheMetadata, Fingerprint, SlideCache};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::llm::{ChatMessage, CompletionOptions, FallbackRouter, Role};
use crate::sanitize::sanitize_html;
use crate::slide::{Message, Slide};
use crate::telemetry::{CacheEvent, CacheOp, Telemetry, UsageEvent};

pub const EDITOR_SYSTEM_PROMPT: &str = "You are a slide editor. Given existing HTML and an instruction, output only the updated HTML snippet using Tailwind classes. Do not explain.";
pub const SUMMARY_PREFIX: &str = "Summary of earlier edits:\n";

const STYLE_RUBRIC: &str = "Style Rubric: Headings should be prominent using Tailwind (e.g., text-2xl font-bold), lists use proper spacing/bullets, responsive layout, no inline scripts, and clean semantic HTML.";

const SUMMARY_EXAMPLE: &str = "Example:
user: Change the header to be larger and blue.
assistant: <div class=\"text-2xl font-bold text-blue-600\">Title</div>
user: Convert bullet list to checkmarks.
assistant: <ul class=\"list-disc\">...</ul>

Summary of earlier changes should look like:
- Made header larger and blue.
- Converted bullet list to checkmarks.";

/// Messages sent for one edit: system prompt, prior summary, last assistant turn
/// and the instruction with the current HTML inlined.
pub fn build_edit_messages(slide: &Slide, instruction: &str) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(EDITOR_SYSTEM_PROMPT)];
    if let Some(summary) = slide.chat_history.iter().find(|m| m.role == Role::System) {
        messages.push(ChatMessage::system(summary.content.clone()));
    }
    if let Some(last) = slide
        .chat_history
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
    {
        messages.push(ChatMessage::assistant(last.content.clone()));
    }
    messages.push(ChatMessage::user(format!(
        "Here is the current HTML:\n{}\n\nInstruction: {}. Return the full updated HTML slide snippet.",
        slide.current_html, instruction
    )));
    messages
}

fn build_summary_prompt(earlier: &[Message]) -> String {
    let formatted = earlier
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            format!("{}: {}", role, m.content.replace('\n', " "))
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a conversation summarizer for slide edits. {}\n\
Condense the earlier messages into 3 to 5 concise bullet points capturing what was changed or requested. Do not include the last two messages; those will be preserved separately.\n\
\n{}\n\
\nEarlier messages:\n{}\n\
\nOutput only the bullet points, each starting with a dash.",
        STYLE_RUBRIC, SUMMARY_EXAMPLE, formatted
    )
}

#[derive(Clone)]
pub struct EditEngine {
    router: FallbackRouter,
    cache: Arc<SlideCache>,
    branding: Arc<BrandContext>,
    telemetry: Arc<dyn Telemetry>,
    config: EngineConfig,
}

impl EditEngine {
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

    /// Collapses all but the last two chat messages into one system summary once the
    /// history exceeds the configured threshold.
    ///
    /// Returns whether the history was rewritten. Provider failures and summaries that
    /// are not a bullet list leave the history untouched.
    pub async fn condense_history(&self, slide: &mut Slide) -> bool {
        let len = slide.chat_history.len();
        if len <= self.config.condense_threshold || len < 2 {
            return false;
        }

        let (earlier, _) = slide.chat_history.split_at(len - 2);
        let prompt = build_summary_prompt(earlier);
        let options = CompletionOptions::new().max_tokens(self.config.summary_max_tokens);

        let start = Instant::now();
        let generated = match self.router.generate(&prompt, &options).await {
            Ok(generated) => generated,
            Err(err) => {
                log::warn!("[Summary] condensation failed for {}, skipping: {}", slide.id, err);
                return false;
            }
        };

        let summary = generated.text.trim();
        if !(summary.starts_with('-') || summary.starts_with('\u{2022}')) {
            log::warn!("[Summary] malformed summary for {}, skipping", slide.id);
            return false;
        }

        self.telemetry.record_usage(UsageEvent {
            prompt,
            source: generated.source.clone(),
            duration: start.elapsed(),
            output_length: generated.text.len(),
        });

        let last_two = slide.chat_history.split_off(len - 2);
        slide.chat_history = std::iter::once(Message::new(
            Role::System,
            format!("{}{}", SUMMARY_PREFIX, summary),
        ))
        .chain(last_two)
        .collect();
        log::debug!("[Summary] condensed {} messages for {}", len, slide.id);
        true
    }

    /// Applies `instruction` to `slide`, producing exactly one new version.
    ///
    /// Locked slides are rejected before anything is touched. On provider failure the
    /// slide keeps its HTML and versions; only a completed condensation persists.
    pub async fn apply_edit(&self, slide: &mut Slide, instruction: &str) -> Result<()> {
        slide.ensure_editable()?;
        self.condense_history(slide).await;

        let model = self.config.model.as_str();
        let sanitized_input = sanitize_html(&slide.current_html);
        let lookup_key = Fingerprint::new(&sanitized_input, &self.branding, model)
            .instruction(instruction)
            .key();

        if let Some(entry) = self.cache.get(&lookup_key) {
            slide.record_mutation(
                entry.html.clone(),
                entry.source_tag(),
                Some(instruction.to_string()),
            );
            slide.push_message(Role::User, instruction);
            slide.push_message(Role::Assistant, entry.html);
            self.telemetry.record_cache(CacheEvent {
                op: CacheOp::Edit,
                hit: true,
            });
            return Ok(());
        }

        let messages = build_edit_messages(slide, instruction);
        let options = CompletionOptions::new()
            .model(model)
            .max_tokens(self.config.generation_max_tokens);

        let start = Instant::now();
        let generated = self.router.edit(&messages, &options).await?;
        let duration = start.elapsed();

        let html = sanitize_html(&generated.text);
        slide.record_mutation(
            html.clone(),
            generated.source.clone(),
            Some(instruction.to_string()),
        );
        slide.push_message(Role::User, instruction);
        slide.push_message(Role::Assistant, html.clone());

        self.telemetry.record_usage(UsageEvent {
            prompt: instruction.to_string(),
            source: generated.source.clone(),
            duration,
            output_length: generated.text.len(),
        });
        self.telemetry.record_cache(CacheEvent {
            op: CacheOp::Edit,
            hit: false,
        });

        let metadata = CacheMetadata {
            source: generated.source,
            prompt_hash: sha256_hex(instruction),
            branding_snapshot: self.branding.fingerprint_value(),
        };
        let output_key = Fingerprint::new(&html, &self.branding, model)
            .instruction(instruction)
            .key();
        if output_key != lookup_key {
            self.cache.set(output_key, html.clone(), metadata.clone());
        }
        self.cache.set(lookup_key, html, metadata);
        Ok(())
    }
}
