//! Backing store implementations and enum dispatch

pub mod memory;

#[cfg(feature = "cache-redis")]
pub mod redis;

pub use memory::MemoryStore;

#[cfg(feature = "cache-redis")]
pub use self::redis::RedisStore;

use super::errors::{CacheError, CacheResult};
use super::traits::BackingStore;
use crate::config::CacheSettings;
use std::time::Duration;
use tracing::info;

/// Configured backing store, dispatched without a vtable
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// Redis store (boxed to reduce enum size)
    #[cfg(feature = "cache-redis")]
    Redis(Box<RedisStore>),

    /// In-process store
    Memory(MemoryStore),
}

impl StoreBackend {
    /// Build the backend named by `settings.backend`.
    ///
    /// A Redis backend that cannot be reached is an error; the cache does not
    /// silently fall back to in-process storage.
    pub async fn from_settings(settings: &CacheSettings) -> CacheResult<Self> {
        match settings.backend.as_str() {
            "redis" => Self::create_redis_backend(settings).await,
            "memory" => {
                info!(backend = "memory", "In-process cache store initialized");
                Ok(Self::Memory(MemoryStore::new()))
            }
            other => Err(CacheError::Configuration(format!(
                "unknown cache backend `{other}`"
            ))),
        }
    }

    #[cfg(feature = "cache-redis")]
    async fn create_redis_backend(settings: &CacheSettings) -> CacheResult<Self> {
        let store = RedisStore::from_settings(&settings.redis).await?;
        Ok(Self::Redis(Box::new(store)))
    }

    #[cfg(not(feature = "cache-redis"))]
    async fn create_redis_backend(_settings: &CacheSettings) -> CacheResult<Self> {
        Err(CacheError::Configuration(
            "Redis backend requested but the 'cache-redis' feature is not enabled".to_string(),
        ))
    }
}

impl BackingStore for StoreBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.get(key).await,
            Self::Memory(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.set(key, value, ttl).await,
            Self::Memory(s) => s.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.delete(keys).await,
            Self::Memory(s) => s.delete(keys).await,
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.delete_pattern(pattern).await,
            Self::Memory(s) => s.delete_pattern(pattern).await,
        }
    }

    async fn flush(&self) -> CacheResult<u64> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.flush().await,
            Self::Memory(s) => s.flush().await,
        }
    }

    async fn health_check(&self) -> CacheResult<bool> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.health_check().await,
            Self::Memory(s) => s.health_check().await,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.provider_name(),
            Self::Memory(s) => s.provider_name(),
        }
    }
}
