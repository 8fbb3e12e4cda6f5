//! # Metrics Cache Module
//!
//! Versioned, optionally compressed key/value cache shared by the metrics,
//! benchmark and source read paths.
//!
//! ## Architecture
//!
//! ```text
//! CacheService                     <- public API, read/write policy
//!   ├── CircuitBreaker             <- every store call, fail-fast when open
//!   ├── CompressionCodec           <- gzip + base64 above the threshold
//!   ├── VersionTracker             <- local staleness guard
//!   └── StoreBackend (enum)        <- zero-cost dispatch, no vtable
//!         ├── Redis(RedisStore)    <- ConnectionManager / cluster, SCAN for patterns
//!         └── Memory(MemoryStore)  <- in-process, single-instance and tests
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use metrics_cache::cache::{CacheNamespace, CacheService};
//! use metrics_cache::config::load_settings;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = load_settings(None)?;
//! let cache = CacheService::from_settings(&settings).await?;
//!
//! let key = CacheNamespace::Metrics.key("list", &serde_json::json!({"page": 1}))?;
//! cache.set(&key, &vec![1, 2, 3], Some(Duration::from_secs(300))).await?;
//! let hit: Option<Vec<u32>> = cache.get(&key).await;
//!
//! // After a metric is created, updated or deleted
//! cache.invalidate_pattern(&CacheNamespace::Metrics.pattern()).await?;
//! # let _ = hit;
//! # Ok(())
//! # }
//! ```
//!
//! ## Cross-replica staleness
//!
//! The version table is per process. A replica that never wrote a key
//! accepts whatever entry the store holds, so the staleness guard only
//! protects a process against entries older than its own last write.

pub mod codec;
pub mod entry;
pub mod errors;
pub mod keys;
pub mod providers;
pub mod service;
pub mod traits;
pub mod version;

pub use codec::CompressionCodec;
pub use entry::{CacheEntry, EntryMetadata};
pub use errors::{CacheError, CacheErrorKind, CacheResult};
pub use keys::{entity_pattern, escape_glob, generate_key, glob_match, related_pattern, CacheNamespace};
pub use providers::{MemoryStore, StoreBackend};
pub use service::{CacheService, ReadOptions, WriteOptions};
pub use traits::BackingStore;
pub use version::VersionTracker;

#[cfg(feature = "cache-redis")]
pub use providers::RedisStore;
