#![allow(clippy::doc_markdown)] // Allow technical terms like Redis, SCAN in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Metrics Cache
//!
//! Resilient caching layer for the benchmark metrics backend.
//!
//! ## Overview
//!
//! The metrics, benchmark and source services answer filtered, paginated
//! queries that are expensive to recompute. This crate is the single cache
//! instance they share: a versioned, optionally compressed key/value cache in
//! front of Redis, protected by a circuit breaker, with pattern-based
//! invalidation for writers.
//!
//! ## Key Features
//!
//! - **Fail-fast degradation**: a struggling store is cut off by the circuit
//!   breaker and reads fall through to the primary data source
//! - **Transparent compression**: payloads above 1 KiB are gzip-compressed
//! - **Staleness guard**: per-process version numbers reject entries older
//!   than this process's last write
//! - **Pattern invalidation**: SCAN-based, never `KEYS`
//! - **Tagged errors**: callers switch on [`cache::CacheErrorKind`]
//!
//! ## Module Organization
//!
//! - [`cache`] - Cache service, codec, version tracking, keys and backing stores
//! - [`resilience`] - Circuit breaker
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use metrics_cache::{init_structured_logging, load_settings, CacheService};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! init_structured_logging();
//!
//! let settings = load_settings(None)?;
//! let cache = CacheService::from_settings(&settings).await?;
//!
//! cache
//!     .set("metrics:list:p1", &serde_json::json!({"total": 14}), Some(Duration::from_secs(300)))
//!     .await?;
//! let page: Option<serde_json::Value> = cache.get("metrics:list:p1").await;
//! # let _ = page;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test                            # Unit, integration and property tests
//! cargo test --features test-services   # Adds tests against a live Redis
//! ```

pub mod cache;
pub mod config;
pub mod logging;
pub mod resilience;

pub use cache::{
    BackingStore, CacheError, CacheErrorKind, CacheNamespace, CacheResult, CacheService,
    MemoryStore, ReadOptions, StoreBackend, WriteOptions,
};
pub use config::{load_settings, CacheSettings, ConfigurationError};
pub use logging::init_structured_logging;
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
