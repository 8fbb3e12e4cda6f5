//! # Circuit Breaker Configuration
//!
//! Runtime parameters for the cache circuit breaker. The serde-facing,
//! millisecond-based settings live in `crate::config::CircuitBreakerSettings`
//! and convert into this struct via `to_resilience_config()`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single circuit breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Error ratio (0.0 to 1.0) over the rolling window that opens the circuit
    /// once exceeded
    pub error_threshold: f64,

    /// Number of most recent calls kept in the rolling window
    pub window_size: usize,

    /// Calls that must be observed in the window before the ratio is evaluated
    pub minimum_calls: usize,

    /// Upper bound for a single protected call; slower calls are abandoned
    pub call_timeout: Duration,

    /// Time to wait in open state before admitting a recovery probe
    pub reset_timeout: Duration,

    /// Open immediately when a single call exceeds `call_timeout`
    pub open_on_timeout: bool,
}

impl CircuitBreakerConfig {
    /// Tight settings for tests and local tooling
    pub fn for_testing() -> Self {
        Self {
            error_threshold: 0.5,
            window_size: 4,
            minimum_calls: 2,
            call_timeout: Duration::from_millis(100),
            reset_timeout: Duration::from_millis(50),
            open_on_timeout: true,
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if !(self.error_threshold > 0.0 && self.error_threshold <= 1.0) {
            return Err("error_threshold must be within (0.0, 1.0]".to_string());
        }

        if self.window_size == 0 {
            return Err("window_size must be greater than 0".to_string());
        }

        if self.minimum_calls > self.window_size {
            return Err("minimum_calls must not exceed window_size".to_string());
        }

        if self.call_timeout.is_zero() {
            return Err("call_timeout must be greater than 0".to_string());
        }

        if self.reset_timeout.is_zero() {
            return Err("reset_timeout must be greater than 0".to_string());
        }

        if self.reset_timeout > Duration::from_secs(300) {
            return Err("reset_timeout should not exceed 300 seconds".to_string());
        }

        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            error_threshold: 0.5,
            window_size: 20,
            minimum_calls: 5,
            call_timeout: Duration::from_secs(3),
            reset_timeout: Duration::from_secs(30),
            open_on_timeout: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_breaker_config_validation() {
        let valid_config = CircuitBreakerConfig::default();
        assert!(valid_config.validate().is_ok());

        let mut invalid_config = CircuitBreakerConfig {
            error_threshold: 0.0,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        invalid_config = CircuitBreakerConfig {
            error_threshold: 1.5,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        invalid_config = CircuitBreakerConfig {
            call_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());

        invalid_config = CircuitBreakerConfig {
            window_size: 3,
            minimum_calls: 5,
            ..Default::default()
        };
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_defaults_match_cache_policy() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.error_threshold, 0.5);
        assert_eq!(config.call_timeout, Duration::from_secs(3));
        assert_eq!(config.reset_timeout, Duration::from_secs(30));
        assert!(CircuitBreakerConfig::for_testing().validate().is_ok());
    }
}
