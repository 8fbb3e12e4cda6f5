//! Cache error types

use crate::resilience::CircuitBreakerError;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// No entry for the key (only produced by `get_required`)
    #[error("Cache entry not found: {key}")]
    NotFound { key: String },

    /// Backing store failure: connection refused, timeout, protocol error
    #[error("Cache backend error during {operation}: {message}")]
    Transient {
        operation: &'static str,
        message: String,
    },

    /// Call rejected by the open circuit breaker
    #[error("Cache circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Misuse of the cache, e.g. a non-forced `clear` in production
    #[error("Cache configuration error: {0}")]
    Configuration(String),

    /// Failed to serialize, deserialize, compress or decompress a payload
    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

/// Closed set of error tags callers switch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheErrorKind {
    NotFound,
    Transient,
    CircuitOpen,
    Config,
}

impl CacheError {
    pub fn transient(operation: &'static str, message: impl Into<String>) -> Self {
        CacheError::Transient {
            operation,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> CacheErrorKind {
        match self {
            CacheError::NotFound { .. } => CacheErrorKind::NotFound,
            CacheError::Transient { .. } => CacheErrorKind::Transient,
            CacheError::CircuitOpen { .. } => CacheErrorKind::CircuitOpen,
            CacheError::Configuration(_) | CacheError::Serialization(_) => CacheErrorKind::Config,
        }
    }

    /// Transient and circuit-open failures are degraded-store conditions
    pub fn is_degraded_store(&self) -> bool {
        matches!(
            self.kind(),
            CacheErrorKind::Transient | CacheErrorKind::CircuitOpen
        )
    }
}

impl From<CircuitBreakerError<CacheError>> for CacheError {
    fn from(err: CircuitBreakerError<CacheError>) -> Self {
        match err {
            CircuitBreakerError::CircuitOpen { component } => CacheError::CircuitOpen { component },
            CircuitBreakerError::Timeout { component, timeout } => CacheError::Transient {
                operation: "call",
                message: format!("{component} timed out after {}ms", timeout.as_millis()),
            },
            CircuitBreakerError::OperationFailed(inner) => inner,
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
