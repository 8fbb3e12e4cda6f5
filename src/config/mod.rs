//! # Cache Configuration
//!
//! Settings for the application-wide cache: backing store connection, TTL and
//! compression policy, and circuit breaker thresholds. Values are layered by
//! [`loader::load_settings`]: serde defaults, then an optional file, then
//! `METRICS_CACHE_*` environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use metrics_cache::config::load_settings;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = load_settings(None)?;
//! let ttl = settings.default_ttl();
//! let threshold = settings.circuit_breaker.error_threshold_percentage;
//! # let _ = (ttl, threshold);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::resilience::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::load_settings;

/// Environment name that enables production guards (e.g. refusing `clear`)
pub const PRODUCTION_ENVIRONMENT: &str = "production";

/// Top-level cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Deployment environment; `production` guards destructive operations
    pub environment: String,
    /// Backing store: `redis` or `memory`
    pub backend: String,
    /// TTL consumers use when they have no better value
    pub default_ttl_seconds: u64,
    /// Serialized payloads larger than this are compressed
    pub compression_threshold_bytes: usize,
    pub redis: RedisSettings,
    pub circuit_breaker: CircuitBreakerSettings,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            environment: crate::logging::detect_environment(),
            backend: "redis".to_string(),
            default_ttl_seconds: 300,
            compression_threshold_bytes: 1024,
            redis: RedisSettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
        }
    }
}

impl CacheSettings {
    /// In-memory backend with tight breaker timings, for tests
    pub fn for_test() -> Self {
        Self {
            environment: "test".to_string(),
            backend: "memory".to_string(),
            circuit_breaker: CircuitBreakerSettings {
                call_timeout_ms: 200,
                reset_timeout_ms: 100,
                window_size: 4,
                minimum_calls: 2,
                ..CircuitBreakerSettings::default()
            },
            ..Self::default()
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case(PRODUCTION_ENVIRONMENT)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        match self.backend.as_str() {
            "redis" | "memory" => {}
            other => {
                return Err(ConfigurationError::invalid(
                    "backend",
                    format!("unknown backend `{other}`, expected `redis` or `memory`"),
                ))
            }
        }

        if self.compression_threshold_bytes == 0 {
            return Err(ConfigurationError::invalid(
                "compression_threshold_bytes",
                "must be greater than 0",
            ));
        }

        if self.default_ttl_seconds == 0 {
            warn!("default_ttl_seconds is 0 - consumers using the default TTL will write entries without expiry");
        }

        if self.backend == "redis" {
            self.redis.validate()?;
        }
        self.circuit_breaker.validate()
    }

    /// Log current configuration for debugging
    pub fn log_configuration(&self) {
        info!(
            environment = %self.environment,
            backend = %self.backend,
            default_ttl_seconds = self.default_ttl_seconds,
            compression_threshold_bytes = self.compression_threshold_bytes,
            "Cache configuration"
        );
        if self.backend == "redis" {
            info!(redis = ?self.redis, "Cache backing store");
        }
        info!(circuit_breaker = ?self.circuit_breaker, "Cache circuit breaker");
    }
}

/// Redis connection settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: i64,
    /// `host:port` seed nodes; non-empty switches to cluster mode
    pub cluster_nodes: Vec<String>,
    /// Prepended to every key; `clear` only wipes this namespace when set
    pub key_prefix: String,
    pub connect_timeout_ms: u64,
    pub response_timeout_ms: u64,
    pub retry: RetrySettings,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            username: None,
            password: None,
            database: 0,
            cluster_nodes: Vec::new(),
            key_prefix: String::new(),
            connect_timeout_ms: 5_000,
            response_timeout_ms: 3_000,
            retry: RetrySettings::default(),
        }
    }
}

impl fmt::Debug for RedisSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("cluster_nodes", &self.cluster_nodes)
            .field("key_prefix", &self.key_prefix)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("response_timeout_ms", &self.response_timeout_ms)
            .field("retry", &self.retry)
            .finish()
    }
}

impl RedisSettings {
    pub fn is_cluster(&self) -> bool {
        !self.cluster_nodes.is_empty()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    fn validate(&self) -> ConfigResult<()> {
        if !self.is_cluster() && self.host.trim().is_empty() {
            return Err(ConfigurationError::invalid("redis.host", "must not be empty"));
        }

        if let Some(node) = self
            .cluster_nodes
            .iter()
            .find(|node| node.rsplit_once(':').and_then(|(_, port)| port.parse::<u16>().ok()).is_none())
        {
            return Err(ConfigurationError::invalid(
                "redis.cluster_nodes",
                format!("`{node}` is not a host:port pair"),
            ));
        }

        if self.connect_timeout_ms == 0 {
            return Err(ConfigurationError::invalid(
                "redis.connect_timeout_ms",
                "must be greater than 0",
            ));
        }

        self.retry.validate()
    }
}

/// Exponential, capped reconnect backoff for the Redis client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: usize,
    /// Multiplier applied to `exponent_base ^ attempt`
    pub base_delay_ms: u64,
    pub exponent_base: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 6,
            base_delay_ms: 100,
            exponent_base: 2,
            max_delay_ms: 3_000,
        }
    }
}

impl RetrySettings {
    /// Delay before reconnect attempt `attempt` (0-based), capped at `max_delay_ms`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.exponent_base.saturating_pow(attempt);
        let delay = self.base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.exponent_base < 2 {
            return Err(ConfigurationError::invalid(
                "redis.retry.exponent_base",
                "must be at least 2",
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigurationError::invalid(
                "redis.retry.max_delay_ms",
                "must not be below base_delay_ms",
            ));
        }
        Ok(())
    }
}

/// Circuit breaker thresholds, in configuration units
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Window error percentage that opens the circuit once exceeded
    pub error_threshold_percentage: f64,
    pub call_timeout_ms: u64,
    pub reset_timeout_ms: u64,
    pub window_size: usize,
    pub minimum_calls: usize,
    pub open_on_timeout: bool,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            error_threshold_percentage: 50.0,
            call_timeout_ms: 3_000,
            reset_timeout_ms: 30_000,
            window_size: 20,
            minimum_calls: 5,
            open_on_timeout: true,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn to_resilience_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            error_threshold: self.error_threshold_percentage / 100.0,
            window_size: self.window_size,
            minimum_calls: self.minimum_calls,
            call_timeout: Duration::from_millis(self.call_timeout_ms),
            reset_timeout: Duration::from_millis(self.reset_timeout_ms),
            open_on_timeout: self.open_on_timeout,
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        self.to_resilience_config()
            .validate()
            .map_err(|reason| ConfigurationError::invalid("circuit_breaker", reason))
    }
}
