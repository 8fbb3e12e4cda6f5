//! # Cache Service
//!
//! The application-wide cache API. Every backing store call is routed through
//! the circuit breaker. Writes serialize, optionally compress and wrap the
//! value with version metadata; reads reverse that and reject entries whose
//! version disagrees with the last one this process wrote.
//!
//! Reads and writes fail differently on purpose: a failed read is logged and
//! reported as a miss, while failed writes and invalidations are logged and
//! returned so callers can decide (a failed write is normally non-fatal to
//! the request that triggered it).

use super::codec::CompressionCodec;
use super::entry::CacheEntry;
use super::errors::{CacheError, CacheResult};
use super::keys::related_pattern;
use super::providers::StoreBackend;
use super::traits::BackingStore;
use super::version::VersionTracker;
use crate::config::{CacheSettings, PRODUCTION_ENVIRONMENT};
use crate::logging::log_cache_failure;
use crate::resilience::{CircuitBreaker, CircuitBreakerMetrics, CircuitState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-write options
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// `None` writes without expiry
    pub ttl: Option<Duration>,
    /// Compress when the serialized value exceeds the codec threshold
    pub compress: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            ttl: None,
            compress: true,
        }
    }
}

impl WriteOptions {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }
}

/// Per-read options
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Treat entries whose version differs from the local one as misses
    pub check_version: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            check_version: true,
        }
    }
}

/// Versioned, compressed cache over a breaker-protected backing store.
///
/// Clones share the store, breaker and version table.
pub struct CacheService<S = StoreBackend> {
    store: Arc<S>,
    breaker: Arc<CircuitBreaker>,
    codec: CompressionCodec,
    versions: Arc<VersionTracker>,
    production: bool,
}

impl<S> Clone for CacheService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            breaker: Arc::clone(&self.breaker),
            codec: self.codec,
            versions: Arc::clone(&self.versions),
            production: self.production,
        }
    }
}

impl<S: BackingStore> std::fmt::Debug for CacheService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("provider", &self.store.provider_name())
            .field("circuit_state", &self.breaker.state())
            .field("compression_threshold", &self.codec.threshold())
            .field("tracked_keys", &self.versions.len())
            .field("production", &self.production)
            .finish()
    }
}

impl CacheService<StoreBackend> {
    /// Connect the configured backing store and assemble the service
    pub async fn from_settings(settings: &CacheSettings) -> CacheResult<Self> {
        let store = StoreBackend::from_settings(settings).await?;
        let service = Self::with_settings(store, settings);

        info!(
            provider = service.provider_name(),
            environment = %settings.environment,
            "Cache service initialized"
        );
        Ok(service)
    }
}

impl<S: BackingStore> CacheService<S> {
    /// Assemble a service from explicitly constructed parts
    pub fn new(
        store: S,
        breaker: CircuitBreaker,
        codec: CompressionCodec,
        environment: &str,
    ) -> Self {
        Self {
            store: Arc::new(store),
            breaker: Arc::new(breaker),
            codec,
            versions: Arc::new(VersionTracker::new()),
            production: environment.eq_ignore_ascii_case(PRODUCTION_ENVIRONMENT),
        }
    }

    /// Wrap `store` with a breaker and codec built from `settings`
    pub fn with_settings(store: S, settings: &CacheSettings) -> Self {
        let breaker = CircuitBreaker::new(
            "cache".to_string(),
            settings.circuit_breaker.to_resilience_config(),
        );
        Self::new(
            store,
            breaker,
            CompressionCodec::new(settings.compression_threshold_bytes),
            &settings.environment,
        )
    }

    pub fn provider_name(&self) -> &'static str {
        self.store.provider_name()
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn circuit_metrics(&self) -> CircuitBreakerMetrics {
        self.breaker.metrics()
    }

    /// Breaker protecting the store, for operational overrides
    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Last version this process wrote for `key`
    pub fn tracked_version(&self, key: &str) -> Option<u64> {
        self.versions.current(key)
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    async fn guarded<T, F, Fut>(&self, operation: F) -> CacheResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CacheResult<T>>,
    {
        self.breaker.call(operation).await.map_err(CacheError::from)
    }

    /// Store `value` under `key`, compressing large payloads
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        self.set_with_options(key, value, WriteOptions { ttl, compress: true })
            .await
    }

    pub async fn set_with_options<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: WriteOptions,
    ) -> CacheResult<()> {
        let result = self.write_entry(key, value, options).await;
        if let Err(e) = &result {
            log_cache_failure("set", key, e, false);
        }
        result
    }

    async fn write_entry<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: WriteOptions,
    ) -> CacheResult<()> {
        let serialized = serde_json::to_string(value)?;
        let (payload, compressed) = self.codec.encode(&serialized, options.compress)?;

        let version = self.versions.next_version(key);
        let raw = CacheEntry::new(payload, compressed, version).to_json()?;

        self.guarded(|| self.store.set(key, &raw, options.ttl)).await?;

        debug!(
            key = key,
            version = version,
            compressed = compressed,
            bytes = raw.len(),
            "Cache entry written"
        );
        Ok(())
    }

    /// Read `key` with the staleness check enabled. Misses, stale entries and
    /// every failure come back as `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_with_options(key, ReadOptions::default()).await
    }

    pub async fn get_with_options<T: DeserializeOwned>(
        &self,
        key: &str,
        options: ReadOptions,
    ) -> Option<T> {
        match self.read_entry(key, options).await {
            Ok(value) => value,
            Err(e) => {
                log_cache_failure("get", key, &e, true);
                None
            }
        }
    }

    /// Like [`get`](Self::get) but reports a miss as [`CacheError::NotFound`]
    pub async fn get_required<T: DeserializeOwned>(&self, key: &str) -> CacheResult<T> {
        self.get(key).await.ok_or_else(|| CacheError::NotFound {
            key: key.to_owned(),
        })
    }

    async fn read_entry<T: DeserializeOwned>(
        &self,
        key: &str,
        options: ReadOptions,
    ) -> CacheResult<Option<T>> {
        let Some(raw) = self.guarded(|| self.store.get(key)).await? else {
            return Ok(None);
        };

        let entry = CacheEntry::from_json(&raw)?;

        if options.check_version {
            // No local version means another process (or an earlier run)
            // wrote the entry; only a known, different version is stale
            if let Some(local) = self.versions.current(key) {
                if local != entry.metadata.version {
                    debug!(
                        key = key,
                        local_version = local,
                        stored_version = entry.metadata.version,
                        "Stale cache entry, treating as miss"
                    );
                    self.spawn_stale_delete(key, entry.metadata.version);
                    return Ok(None);
                }
            }
        }

        let serialized = self.codec.decode(&entry.payload, entry.metadata.compressed)?;
        Ok(Some(serde_json::from_str(&serialized)?))
    }

    /// Remove a stale entry in the background. The key is re-read first and
    /// only deleted while it still holds a version other than the tracked one,
    /// so a newer write landing after the stale read is kept. A write landing
    /// between the re-read and the delete can still be removed; the next
    /// read then misses and refills.
    fn spawn_stale_delete(&self, key: &str, stale_version: u64) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(key = key, "No runtime available, stale entry left to expire");
            return;
        };

        let store = Arc::clone(&self.store);
        let breaker = Arc::clone(&self.breaker);
        let versions = Arc::clone(&self.versions);
        let keys = vec![key.to_owned()];
        handle.spawn(async move {
            let key = &keys[0];
            let stored = match breaker.call(|| store.get(key)).await {
                Ok(Some(raw)) => match CacheEntry::from_json(&raw) {
                    Ok(entry) => Some(entry.metadata.version),
                    // Unreadable entries are removed like stale ones
                    Err(_) => None,
                },
                Ok(None) => return,
                Err(e) => {
                    let e = CacheError::from(e);
                    log_cache_failure("delete_stale", key, &e, true);
                    return;
                }
            };

            if stored.is_some() && stored == versions.current(key) {
                debug!(
                    key = key.as_str(),
                    stale_version = stale_version,
                    "Entry rewritten since stale read, keeping it"
                );
                return;
            }

            if let Err(e) = breaker.call(|| store.delete(&keys)).await {
                let e = CacheError::from(e);
                log_cache_failure("delete_stale", key, &e, true);
            }
        });
    }

    /// Read-through helper: return the cached value or compute, store and
    /// return it. A failed cache write never fails the load.
    pub async fn get_or_set_with<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(cached);
        }

        let value = loader().await?;
        if self.set(key, &value, ttl).await.is_err() {
            debug!(key = key, "Cache write after load failed, returning loaded value");
        }
        Ok(value)
    }

    /// Remove `key` and forget its local version
    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        self.versions.forget(key);

        let keys = [key.to_owned()];
        let result = self.guarded(|| self.store.delete(&keys)).await;
        match result {
            Ok(deleted) => {
                debug!(key = key, deleted = deleted, "Cache entry deleted");
                Ok(())
            }
            Err(e) => {
                log_cache_failure("delete", key, &e, false);
                Err(e)
            }
        }
    }

    /// Remove `key` and every key derived from it (`key:*`)
    pub async fn delete_with_related(&self, key: &str) -> CacheResult<()> {
        self.delete(key).await?;

        let pattern = related_pattern(key);
        self.invalidate_pattern(&pattern).await.map(|_| ())
    }

    /// Delete every key matching the glob `pattern`; returns how many were removed
    pub async fn invalidate_pattern(&self, pattern: &str) -> CacheResult<u64> {
        self.versions.forget_matching(pattern);

        match self.guarded(|| self.store.delete_pattern(pattern)).await {
            Ok(deleted) => {
                info!(pattern = pattern, deleted = deleted, "Cache pattern invalidated");
                Ok(deleted)
            }
            Err(e) => {
                log_cache_failure("invalidate_pattern", pattern, &e, false);
                Err(e)
            }
        }
    }

    /// Wipe the cache. Refused in production; use [`force_clear`](Self::force_clear).
    pub async fn clear(&self) -> CacheResult<u64> {
        if self.production {
            let e = CacheError::Configuration(
                "refusing to clear the cache in production without force".to_string(),
            );
            log_cache_failure("clear", "*", &e, false);
            return Err(e);
        }
        self.flush_all().await
    }

    /// Wipe the cache regardless of environment
    pub async fn force_clear(&self) -> CacheResult<u64> {
        if self.production {
            warn!("Force-clearing the production cache");
        }
        self.flush_all().await
    }

    async fn flush_all(&self) -> CacheResult<u64> {
        self.versions.forget_all();

        match self.guarded(|| self.store.flush()).await {
            Ok(deleted) => {
                info!(deleted = deleted, "Cache cleared");
                Ok(deleted)
            }
            Err(e) => {
                log_cache_failure("clear", "*", &e, false);
                Err(e)
            }
        }
    }

    /// Ping the store through the breaker; any failure reports unhealthy
    pub async fn health_check(&self) -> bool {
        match self.guarded(|| self.store.health_check()).await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(error = %e, "Cache health check failed");
                false
            }
        }
    }
}
