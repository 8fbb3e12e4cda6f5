//! Backing store wrapper that injects failures and latency

use metrics_cache::cache::{BackingStore, CacheError, CacheResult, MemoryStore};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct FaultState {
    failing: AtomicBool,
    delay_ms: AtomicU64,
    calls: AtomicU64,
    /// Writes whose value contains the marker sleep this many ms first
    slow_writes: Mutex<Option<(String, u64)>>,
}

/// In-memory store whose calls can be made to fail or hang.
///
/// Clones share both the entries and the fault switches.
#[derive(Debug, Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    faults: Arc<FaultState>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a connection error while set
    pub fn set_failing(&self, failing: bool) {
        self.faults.failing.store(failing, Ordering::SeqCst);
    }

    /// Every call sleeps this long before running
    pub fn set_delay(&self, delay: Duration) {
        self.faults
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Writes whose raw value contains `marker` sleep `delay` before landing
    pub fn slow_writes_containing(&self, marker: &str, delay: Duration) {
        *self.faults.slow_writes.lock() = Some((marker.to_string(), delay.as_millis() as u64));
    }

    /// Calls that reached the store (rejected breaker calls never do)
    pub fn calls(&self) -> u64 {
        self.faults.calls.load(Ordering::SeqCst)
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    async fn enter(&self, operation: &'static str) -> CacheResult<()> {
        self.faults.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.faults.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.faults.failing.load(Ordering::SeqCst) {
            return Err(CacheError::transient(operation, "connection refused"));
        }
        Ok(())
    }
}

impl BackingStore for FlakyStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.enter("get").await?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        self.enter("set").await?;

        let slow = self
            .faults
            .slow_writes
            .lock()
            .as_ref()
            .filter(|(marker, _)| value.contains(marker.as_str()))
            .map(|(_, delay_ms)| *delay_ms);
        if let Some(delay_ms) = slow {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        self.enter("delete").await?;
        self.inner.delete(keys).await
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        self.enter("delete_pattern").await?;
        self.inner.delete_pattern(pattern).await
    }

    async fn flush(&self) -> CacheResult<u64> {
        self.enter("flush").await?;
        self.inner.flush().await
    }

    async fn health_check(&self) -> CacheResult<bool> {
        self.enter("health_check").await?;
        self.inner.health_check().await
    }

    fn provider_name(&self) -> &'static str {
        "flaky"
    }
}
