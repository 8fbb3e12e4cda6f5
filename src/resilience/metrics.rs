//! # Circuit Breaker Metrics
//!
//! Point-in-time snapshot of the cache circuit breaker, used for health
//! reporting and by tests asserting state transitions.

use crate::resilience::CircuitState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Metrics for a single circuit breaker instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerMetrics {
    /// Total number of calls that reached the protected operation
    pub total_calls: u64,

    /// Number of successful calls
    pub success_count: u64,

    /// Number of failed calls (timeouts included)
    pub failure_count: u64,

    /// Number of calls abandoned after exceeding the call timeout
    pub timeout_count: u64,

    /// Number of calls rejected without reaching the operation
    pub rejected_count: u64,

    /// Current consecutive failure count
    pub consecutive_failures: u64,

    /// Failure ratio over the rolling window (0.0 to 1.0)
    pub error_ratio: f64,

    /// Current circuit breaker state
    pub current_state: CircuitState,

    /// When the breaker last changed state (creation time if never)
    pub last_transition_at: DateTime<Utc>,

    /// Lifetime failure rate (0.0 to 1.0)
    pub failure_rate: f64,

    /// Average duration of successful operations
    pub average_duration: Duration,
}

impl CircuitBreakerMetrics {
    /// Check if metrics indicate healthy operation
    pub fn is_healthy(&self) -> bool {
        match self.current_state {
            CircuitState::Closed => self.error_ratio < 0.1,
            CircuitState::Open => false,
            CircuitState::HalfOpen => true,
        }
    }

    /// Get human-readable state description
    pub fn state_description(&self) -> &'static str {
        match self.current_state {
            CircuitState::Closed => "Healthy - Normal operation",
            CircuitState::Open => "Failing - Rejecting all calls",
            CircuitState::HalfOpen => "Recovering - Probing backing store",
        }
    }

    /// Format metrics for logging
    pub fn format_summary(&self) -> String {
        format!(
            "State: {} | Calls: {} | Failures: {} | Timeouts: {} | Rejected: {} | Window error ratio: {:.1}% | Avg Duration: {}ms",
            self.state_description(),
            self.total_calls,
            self.failure_count,
            self.timeout_count,
            self.rejected_count,
            self.error_ratio * 100.0,
            self.average_duration.as_millis()
        )
    }
}
