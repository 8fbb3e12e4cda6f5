//! # Resilience Module
//!
//! Circuit breaker protection for the cache backing store. A degraded store
//! must disappear from the request path rather than add latency to it: once
//! the breaker opens, calls are rejected without touching the network until
//! a recovery probe succeeds.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use metrics_cache::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let circuit_breaker = CircuitBreaker::new("cache".to_string(), CircuitBreakerConfig::default());
//!
//! let value = circuit_breaker
//!     .call(|| async { Ok::<&str, std::io::Error>("pong") })
//!     .await?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod metrics;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerError, CircuitState};
pub use config::CircuitBreakerConfig;
pub use metrics::CircuitBreakerMetrics;
