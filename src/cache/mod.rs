//! Content-addressed HTML cache with TTL-based lazy eviction.
//!
//! Identical (content, brand, instruction, model) tuples map to one [`CacheKey`], so at
//! most one model call is made per fingerprint per TTL window. The cache is owned by the
//! engines that share it (usually behind an `Arc`), never a process global.

pub mod key;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use key::{CacheKey, Fingerprint, INITIAL_INSTRUCTION};

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Provenance stored alongside a cached artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    /// Backend that originally produced the HTML.
    pub source: String,
    pub prompt_hash: String,
    pub branding_snapshot: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub html: String,
    pub metadata: CacheMetadata,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.cached_at) <= ttl,
            // TTL too large to represent: never expires.
            Err(_) => true,
        }
    }

    /// Version source tag for a slide that reused this entry.
    pub fn source_tag(&self) -> String {
        format!("cache({})", self.metadata.source)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
pub struct SlideCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for SlideCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl SlideCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.get_at(key, Utc::now())
    }

    /// Lookup against an explicit clock. Stale entries are removed and reported as misses.
    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CacheEntry> {
        let fresh = {
            let entries = self.read();
            match entries.get(key) {
                Some(entry) if entry.is_fresh(now, self.ttl) => Some(Some(entry.clone())),
                Some(_) => Some(None),
                None => None,
            }
        };

        match fresh {
            Some(Some(entry)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Some(None) => {
                let mut entries = self.write();
                // Re-check under the write lock; a concurrent set may have refreshed it.
                if entries
                    .get(key)
                    .is_some_and(|entry| !entry.is_fresh(now, self.ttl))
                {
                    entries.remove(key);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    log::debug!("[Cache] evicted stale entry {}", key);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Unconditional overwrite.
    pub fn set(&self, key: CacheKey, html: impl Into<String>, metadata: CacheMetadata) {
        self.set_at(key, html, metadata, Utc::now());
    }

    pub fn set_at(
        &self,
        key: CacheKey,
        html: impl Into<String>,
        metadata: CacheMetadata,
        cached_at: DateTime<Utc>,
    ) {
        self.write().insert(
            key,
            CacheEntry {
                html: html.into(),
                metadata,
                cached_at,
            },
        );
    }

    pub fn clear(&self) {
        self.write().clear();
        log::info!("[Cache] cleared");
    }

    /// Number of stored entries, stale ones included until they are read.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    // A panic while holding the lock cannot leave a half-written entry,
    // so a poisoned map is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
