#![allow(dead_code)]

pub mod flaky_store;
pub mod strategies;

pub use flaky_store::*;

use metrics_cache::{CacheService, CacheSettings};

/// Service over a fault-injecting in-memory store, with fast breaker timings
pub fn flaky_service() -> (CacheService<FlakyStore>, FlakyStore) {
    let store = FlakyStore::new();
    let service = CacheService::with_settings(store.clone(), &CacheSettings::for_test());
    (service, store)
}
