//! Usage and cache telemetry sinks.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::cache::key::sha256_hex;

/// Which engine touched the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Generate,
    Edit,
}

impl CacheOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOp::Generate => "generate",
            CacheOp::Edit => "edit",
        }
    }
}

/// One model call.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageEvent {
    pub prompt: String,
    pub source: String,
    pub duration: Duration,
    pub output_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEvent {
    pub op: CacheOp,
    pub hit: bool,
}

/// Sink for per-call usage and cache outcomes.
pub trait Telemetry: Send + Sync {
    fn record_usage(&self, event: UsageEvent);
    fn record_cache(&self, event: CacheEvent);
}

/// Writes events through the `log` facade. Prompts are hashed unless `debug_prompts` is set.
#[derive(Debug, Default)]
pub struct LogTelemetry {
    debug_prompts: bool,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LogTelemetry {
    pub fn new(debug_prompts: bool) -> Self {
        Self {
            debug_prompts,
            ..Default::default()
        }
    }

    pub fn cache_counts(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

impl Telemetry for LogTelemetry {
    fn record_usage(&self, event: UsageEvent) {
        let (field, value) = if self.debug_prompts {
            log::info!("[AI_PROMPT] {}", event.prompt);
            (
                "Prompt",
                event.prompt.split_whitespace().collect::<Vec<_>>().join(" "),
            )
        } else {
            ("PromptHash", sha256_hex(&event.prompt))
        };
        log::info!(
            "[AI] {}={} Source={} DurationMs={} OutputLength={}",
            field,
            value,
            event.source,
            event.duration.as_millis(),
            event.output_length
        );
    }

    fn record_cache(&self, event: CacheEvent) {
        let outcome = if event.hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            "hit"
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            "miss"
        };
        log::info!("[Cache] {} {}", event.op.as_str(), outcome);
    }
}

/// Simple in-memory collector for events.
#[derive(Debug, Default)]
pub struct MemoryTelemetry {
    usage: Mutex<Vec<UsageEvent>>,
    cache: Mutex<Vec<CacheEvent>>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn usage(&self) -> Vec<UsageEvent> {
        self.usage.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn cache_events(&self) -> Vec<CacheEvent> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn hits(&self, op: CacheOp) -> usize {
        self.cache_events()
            .iter()
            .filter(|e| e.op == op && e.hit)
            .count()
    }

    pub fn misses(&self, op: CacheOp) -> usize {
        self.cache_events()
            .iter()
            .filter(|e| e.op == op && !e.hit)
            .count()
    }
}

impl Telemetry for MemoryTelemetry {
    fn record_usage(&self, event: UsageEvent) {
        self.usage
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    fn record_cache(&self, event: CacheEvent) {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
