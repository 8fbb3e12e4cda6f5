//! Backing store trait definition

use super::errors::CacheResult;
use std::future::Future;
use std::time::Duration;

/// Raw key/value operations the cache service needs from a backing store.
///
/// Values are opaque strings (the serialized entry envelope). Implementations
/// report failures as [`CacheError::Transient`](super::errors::CacheError);
/// the service decides whether to absorb or surface them.
pub trait BackingStore: Send + Sync + 'static {
    /// Returns `Ok(Some(value))` on hit, `Ok(None)` on miss
    fn get(&self, key: &str) -> impl Future<Output = CacheResult<Option<String>>> + Send;

    /// Store `value`; `ttl = None` writes without expiry
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> impl Future<Output = CacheResult<()>> + Send;

    /// Delete the given keys, returning how many existed
    fn delete(&self, keys: &[String]) -> impl Future<Output = CacheResult<u64>> + Send;

    /// Delete every key matching a glob pattern (never blocks the server)
    fn delete_pattern(&self, pattern: &str) -> impl Future<Output = CacheResult<u64>> + Send;

    /// Remove every entry this cache owns
    fn flush(&self) -> impl Future<Output = CacheResult<u64>> + Send;

    fn health_check(&self) -> impl Future<Output = CacheResult<bool>> + Send;

    fn provider_name(&self) -> &'static str;
}
