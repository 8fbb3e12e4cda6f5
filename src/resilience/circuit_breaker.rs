//! # Circuit Breaker Implementation
//!
//! Fault isolation for the cache backing store. Three states: Closed (normal
//! operation), Open (failing fast) and Half-Open (a single probe tests
//! recovery). Closed trips to Open when the error ratio over a rolling,
//! count-based window exceeds the configured threshold, or when one call
//! exceeds the call timeout.

use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// Lock-free counters updated on every protected call.
#[derive(Debug)]
struct AtomicCircuitBreakerMetrics {
    total_calls: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    timeout_count: AtomicU64,
    rejected_count: AtomicU64,
    consecutive_failures: AtomicU64,
    success_duration_nanos: AtomicU64,
}

impl AtomicCircuitBreakerMetrics {
    fn new() -> Self {
        Self {
            total_calls: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            timeout_count: AtomicU64::new(0),
            rejected_count: AtomicU64::new(0),
            consecutive_failures: AtomicU64::new(0),
            success_duration_nanos: AtomicU64::new(0),
        }
    }

    #[inline]
    fn record_success(&self, duration: Duration) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.success_count.fetch_add(1, Ordering::Relaxed);
        self.success_duration_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    #[inline]
    fn record_failure(&self, timed_out: bool) -> u64 {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.timeout_count.fetch_add(1, Ordering::Relaxed);
        }
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    fn record_rejection(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn reset_consecutive_failures(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }
}

/// Outcomes of the most recent calls, oldest first.
#[derive(Debug)]
struct RollingWindow {
    outcomes: VecDeque<bool>,
    capacity: usize,
    failures: usize,
}

impl RollingWindow {
    fn new(capacity: usize) -> Self {
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity,
            failures: 0,
        }
    }

    /// Push an outcome and return `(observed_calls, error_ratio)`.
    fn record(&mut self, failed: bool) -> (usize, f64) {
        if self.outcomes.len() == self.capacity {
            if let Some(true) = self.outcomes.pop_front() {
                self.failures -= 1;
            }
        }
        self.outcomes.push_back(failed);
        if failed {
            self.failures += 1;
        }
        (self.outcomes.len(), self.ratio())
    }

    fn ratio(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.failures as f64 / self.outcomes.len() as f64
        }
    }

    fn reset(&mut self) {
        self.outcomes.clear();
        self.failures = 0;
    }
}

/// Get current epoch nanos from SystemTime
#[inline]
fn epoch_nanos_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos() as u64
}

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - a single probe call is allowed through
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Open, // Default to safest state
        }
    }
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open (or a probe is already in flight), call rejected
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Operation exceeded the call timeout and was abandoned
    #[error("Operation on {component} timed out after {timeout:?}")]
    Timeout { component: String, timeout: Duration },

    /// Operation failed and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

/// How a call was let through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Regular,
    Probe,
}

/// Releases the half-open probe slot when the probe finishes or is dropped.
struct ProbeSlot<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ProbeSlot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Core circuit breaker implementation with atomic state management
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and metrics
    name: String,

    /// Current circuit state (atomic for thread safety)
    state: AtomicU8,

    /// Configuration parameters
    config: CircuitBreakerConfig,

    /// Lock-free atomic metrics
    metrics: AtomicCircuitBreakerMetrics,

    /// Count-based rolling window of call outcomes
    window: Mutex<RollingWindow>,

    /// Epoch nanos when circuit was opened (0 = not open).
    opened_at_epoch_nanos: AtomicU64,

    /// Epoch millis of the last state change
    last_transition_epoch_millis: AtomicI64,

    /// Set while the half-open probe is running
    probe_in_flight: AtomicBool,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: String, config: CircuitBreakerConfig) -> Self {
        info!(
            component = %name,
            error_threshold = config.error_threshold,
            window_size = config.window_size,
            call_timeout_ms = config.call_timeout.as_millis() as u64,
            reset_timeout_ms = config.reset_timeout.as_millis() as u64,
            "Circuit breaker initialized"
        );

        let window = Mutex::new(RollingWindow::new(config.window_size.max(1)));

        Self {
            name,
            state: AtomicU8::new(CircuitState::Closed as u8),
            config,
            metrics: AtomicCircuitBreakerMetrics::new(),
            window,
            opened_at_epoch_nanos: AtomicU64::new(0),
            last_transition_epoch_millis: AtomicI64::new(Utc::now().timestamp_millis()),
            probe_in_flight: AtomicBool::new(false),
        }
    }

    /// Get current circuit state
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Execute an operation with circuit breaker protection.
    ///
    /// The operation is bounded by the configured call timeout; on expiry it
    /// is dropped and recorded as a failure.
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(admission) = self.try_admit() else {
            self.metrics.record_rejection();
            debug!(component = %self.name, "Call rejected, circuit open");
            return Err(CircuitBreakerError::CircuitOpen {
                component: self.name.clone(),
            });
        };

        let _probe_slot = (admission == Admission::Probe).then(|| ProbeSlot {
            flag: &self.probe_in_flight,
        });

        let start_time = Instant::now();
        let outcome = tokio::time::timeout(self.config.call_timeout, operation()).await;
        let duration = start_time.elapsed();

        match outcome {
            Ok(Ok(value)) => {
                self.record_success(duration, admission);
                Ok(value)
            }
            Ok(Err(e)) => {
                self.record_failure(duration, admission, false);
                Err(CircuitBreakerError::OperationFailed(e))
            }
            Err(_) => {
                self.record_failure(duration, admission, true);
                Err(CircuitBreakerError::Timeout {
                    component: self.name.clone(),
                    timeout: self.config.call_timeout,
                })
            }
        }
    }

    /// Decide whether a call may proceed, moving Open to HalfOpen once the
    /// reset timeout has elapsed.
    fn try_admit(&self) -> Option<Admission> {
        match self.state() {
            CircuitState::Closed => Some(Admission::Regular),
            CircuitState::Open => {
                let opened_nanos = self.opened_at_epoch_nanos.load(Ordering::Acquire);
                let elapsed_nanos = epoch_nanos_now().saturating_sub(opened_nanos);
                if elapsed_nanos < self.config.reset_timeout.as_nanos() as u64 {
                    return None;
                }

                if self
                    .state
                    .compare_exchange(
                        CircuitState::Open as u8,
                        CircuitState::HalfOpen as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok()
                {
                    self.mark_transition();
                    info!(
                        component = %self.name,
                        "Circuit breaker half-open (probing recovery)"
                    );
                }
                self.try_acquire_probe()
            }
            CircuitState::HalfOpen => self.try_acquire_probe(),
        }
    }

    fn try_acquire_probe(&self) -> Option<Admission> {
        self.probe_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Admission::Probe)
    }

    /// Record a successful operation
    fn record_success(&self, duration: Duration, admission: Admission) {
        self.metrics.record_success(duration);

        debug!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            "Operation succeeded"
        );

        match (self.state(), admission) {
            (CircuitState::HalfOpen, Admission::Probe) => self.transition_to_closed(),
            (CircuitState::Closed, _) => {
                self.metrics.reset_consecutive_failures();
                self.window.lock().record(false);
            }
            // Late completion of a call admitted before the circuit opened
            _ => {}
        }
    }

    /// Record a failed or timed-out operation
    fn record_failure(&self, duration: Duration, admission: Admission, timed_out: bool) {
        let consecutive = self.metrics.record_failure(timed_out);

        warn!(
            component = %self.name,
            duration_ms = duration.as_millis() as u64,
            timed_out = timed_out,
            consecutive_failures = consecutive,
            "Operation failed"
        );

        match (self.state(), admission) {
            (CircuitState::Closed, _) => {
                let (observed, ratio) = self.window.lock().record(true);
                let ratio_exceeded =
                    observed >= self.config.minimum_calls && ratio > self.config.error_threshold;
                let timeout_trip = timed_out && self.config.open_on_timeout;

                if ratio_exceeded || timeout_trip {
                    self.transition_to_open(ratio, timed_out);
                }
            }
            (CircuitState::HalfOpen, Admission::Probe) => {
                let ratio = self.window.lock().ratio();
                self.transition_to_open(ratio, timed_out);
            }
            _ => {}
        }
    }

    fn mark_transition(&self) {
        self.last_transition_epoch_millis
            .store(Utc::now().timestamp_millis(), Ordering::Release);
    }

    /// Transition to closed state (normal operation)
    fn transition_to_closed(&self) {
        self.metrics.reset_consecutive_failures();
        self.window.lock().reset();
        self.opened_at_epoch_nanos.store(0, Ordering::Release);

        // Store state last (after window reset)
        self.state
            .store(CircuitState::Closed as u8, Ordering::Release);
        self.mark_transition();

        info!(
            component = %self.name,
            total_calls = self.metrics.total_calls.load(Ordering::Relaxed),
            "Circuit breaker closed (recovered)"
        );
    }

    /// Transition to open state (failing fast)
    fn transition_to_open(&self, error_ratio: f64, timed_out: bool) {
        self.opened_at_epoch_nanos
            .store(epoch_nanos_now(), Ordering::Release);

        // Store state last
        self.state
            .store(CircuitState::Open as u8, Ordering::Release);
        self.mark_transition();

        error!(
            component = %self.name,
            error_ratio = error_ratio,
            error_threshold = self.config.error_threshold,
            tripped_by_timeout = timed_out,
            reset_timeout_ms = self.config.reset_timeout.as_millis() as u64,
            "Circuit breaker opened (failing fast)"
        );
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        warn!(component = %self.name, "Circuit breaker forced open");
        let ratio = self.window.lock().ratio();
        self.transition_to_open(ratio, false);
    }

    /// Force circuit to closed state (for emergency recovery)
    pub fn force_closed(&self) {
        warn!(component = %self.name, "Circuit breaker forced closed");
        self.transition_to_closed();
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let total_calls = self.metrics.total_calls.load(Ordering::Relaxed);
        let success_count = self.metrics.success_count.load(Ordering::Relaxed);
        let failure_count = self.metrics.failure_count.load(Ordering::Relaxed);
        let success_nanos = self.metrics.success_duration_nanos.load(Ordering::Relaxed);

        let failure_rate = if total_calls > 0 {
            failure_count as f64 / total_calls as f64
        } else {
            0.0
        };
        let average_duration = if success_count > 0 {
            Duration::from_nanos(success_nanos / success_count)
        } else {
            Duration::ZERO
        };
        let last_transition_at = DateTime::<Utc>::from_timestamp_millis(
            self.last_transition_epoch_millis.load(Ordering::Acquire),
        )
        .unwrap_or_else(Utc::now);

        CircuitBreakerMetrics {
            total_calls,
            success_count,
            failure_count,
            timeout_count: self.metrics.timeout_count.load(Ordering::Relaxed),
            rejected_count: self.metrics.rejected_count.load(Ordering::Relaxed),
            consecutive_failures: self.metrics.consecutive_failures.load(Ordering::Relaxed),
            error_ratio: self.window.lock().ratio(),
            current_state: self.state(),
            last_transition_at,
            failure_rate,
            average_duration,
        }
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the configuration this breaker runs with
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Closed with a window error ratio below 10%
    pub fn is_healthy(&self) -> bool {
        self.state() == CircuitState::Closed && self.window.lock().ratio() < 0.1
    }
}
