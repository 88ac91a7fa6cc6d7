//! Query cache shared by list fetches and the revalidation webhook
//!
//! Entries are keyed by entity name plus request parameters. The entity name
//! doubles as the invalidation tag, so one revalidation drops every page of a
//! collection at once.

use cartjo_core::Locale;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Entries older than this are dropped on read and by the sweep
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(5 * 60);

/// Cache key: `[entity, params...]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub entity: String,
    pub params: Vec<(String, String)>,
}

impl QueryKey {
    pub fn new(entity: impl Into<String>, params: Vec<(String, String)>) -> Self {
        Self {
            entity: entity.into(),
            params,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: JsonValue,
    stored_at: Instant,
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub entities: usize,
}

pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    gc_time: Duration,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_gc_time(DEFAULT_GC_TIME)
    }

    pub fn with_gc_time(gc_time: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            gc_time,
        }
    }

    pub const fn gc_time(&self) -> Duration {
        self.gc_time
    }

    /// Cached value for `key`, unless missing or expired
    pub async fn get(&self, key: &QueryKey) -> Option<JsonValue> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() >= self.gc_time {
            debug!(entity = %key.entity, "cache entry expired");
            return None;
        }
        debug!(entity = %key.entity, "cache hit");
        Some(entry.value.clone())
    }

    pub async fn insert(&self, key: QueryKey, value: JsonValue) {
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Drop every entry of `entity`; returns the number removed
    pub async fn invalidate_tag(&self, entity: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| key.entity != entity);
        let removed = before - entries.len();
        info!(tag = entity, removed, "cache tag invalidated");
        removed
    }

    /// Drop entries rendered for a storefront page path.
    ///
    /// The locale prefix is ignored and the first remaining segment names the
    /// entity, so `/en/products/p1` drops every `products` entry. The root
    /// path drops everything.
    pub async fn invalidate_path(&self, path: &str) -> usize {
        let (_, rest) = Locale::from_path(path);
        match rest.split('/').find(|segment| !segment.is_empty()) {
            Some(entity) => self.invalidate_tag(entity).await,
            None => self.clear().await,
        }
    }

    /// Drop everything; returns the number removed
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let removed = entries.len();
        entries.clear();
        info!(removed, "cache purged");
        removed
    }

    /// Remove expired entries; returns the number removed
    pub async fn purge_expired(&self) -> usize {
        let gc_time = self.gc_time;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.stored_at.elapsed() < gc_time);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "expired cache entries swept");
        }
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let mut entities: Vec<&str> = entries.keys().map(|k| k.entity.as_str()).collect();
        entities.sort_unstable();
        entities.dedup();
        CacheStats {
            entries: entries.len(),
            entities: entities.len(),
        }
    }

    /// Start the background sweep
    pub fn spawn_gc(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                cache.purge_expired().await;
            }
        })
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("gc_time", &self.gc_time)
            .finish_non_exhaustive()
    }
}
