//! In-process backing store
//!
//! Keeps entries in a `HashMap` behind a `parking_lot::RwLock` with per-entry
//! expiry. Used for single-process deployments and tests.
//!
//! **Important**: This store is NOT distributed. Each process keeps its own
//! entries, so invalidations in one replica are invisible to the others.

use crate::cache::errors::CacheResult;
use crate::cache::keys::glob_match;
use crate::cache::traits::BackingStore;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory backing store; clones share the same entries
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, StoredValue>>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entry_count", &self.entries.read().len())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|v| !v.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw stored value, bypassing the cache service
    pub fn raw(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .filter(|v| !v.is_expired(now))
            .map(|v| v.value.clone())
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.write().retain(|_, v| !v.is_expired(now));
    }
}

impl BackingStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let result = self.raw(key);

        if result.is_some() {
            debug!(key = key, "Cache HIT (memory)");
        } else {
            debug!(key = key, "Cache MISS (memory)");
        }

        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let stored = StoredValue {
            value: value.to_owned(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().insert(key.to_owned(), stored);

        debug!(
            key = key,
            ttl_seconds = ttl.map(|t| t.as_secs()),
            "Cache SET (memory)"
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let deleted = keys
            .iter()
            .filter_map(|key| entries.remove(key))
            .filter(|v| !v.is_expired(now))
            .count() as u64;

        debug!(keys = keys.len(), deleted = deleted, "Cache DEL (memory)");
        Ok(deleted)
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        self.purge_expired();

        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !glob_match(pattern, key));
        let deleted = (before - entries.len()) as u64;

        debug!(pattern = pattern, deleted = deleted, "Cache pattern DEL (memory)");
        Ok(deleted)
    }

    async fn flush(&self) -> CacheResult<u64> {
        self.purge_expired();

        let mut entries = self.entries.write();
        let deleted = entries.len() as u64;
        entries.clear();

        debug!(deleted = deleted, "Cache FLUSH (memory)");
        Ok(deleted)
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
