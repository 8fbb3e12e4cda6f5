//! Circuit breaker behavior through the cache service

mod common;

use common::flaky_service;
use metrics_cache::cache::CacheErrorKind;
use metrics_cache::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
use metrics_cache::CircuitState;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_open_circuit_fails_fast_without_touching_store() {
    let (cache, store) = flaky_service();
    store.set_failing(true);

    // Two failures out of two calls exceed the 50% threshold
    assert_eq!(cache.get::<i32>("metrics:list:p1").await, None);
    assert_eq!(cache.get::<i32>("metrics:list:p1").await, None);
    assert_eq!(cache.circuit_state(), CircuitState::Open);

    let calls_before = store.calls();
    let started = Instant::now();
    let err = cache.set("metrics:list:p1", &1, None).await.unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::CircuitOpen);
    assert_eq!(cache.get::<i32>("metrics:list:p1").await, None);

    assert!(started.elapsed() < Duration::from_millis(50));
    assert_eq!(store.calls(), calls_before);
    assert_eq!(cache.circuit_metrics().rejected_count, 2);
}

#[tokio::test]
async fn test_slow_store_trips_on_timeout() {
    let (cache, store) = flaky_service();
    store.set_delay(Duration::from_millis(500));

    let started = Instant::now();
    let err = cache.set("k", &1, None).await.unwrap_err();
    // Abandoned at the 200ms call timeout rather than waiting for the store
    assert!(started.elapsed() < Duration::from_millis(450));
    assert_eq!(err.kind(), CacheErrorKind::Transient);
    assert_eq!(cache.circuit_state(), CircuitState::Open);
    assert_eq!(cache.circuit_metrics().timeout_count, 1);
}

#[tokio::test]
async fn test_circuit_recovers_after_reset_timeout() {
    let (cache, store) = flaky_service();
    store.set_failing(true);
    for _ in 0..2 {
        let _ = cache.set("k", &1, None).await;
    }
    assert_eq!(cache.circuit_state(), CircuitState::Open);

    store.set_failing(false);
    tokio::time::sleep(Duration::from_millis(150)).await;

    // First call after the reset timeout is the probe and closes the circuit
    cache.set("k", &2, None).await.unwrap();
    assert_eq!(cache.circuit_state(), CircuitState::Closed);
    assert_eq!(cache.get::<i32>("k").await, Some(2));
}

#[tokio::test]
async fn test_failed_probe_reopens() {
    let (cache, store) = flaky_service();
    store.set_failing(true);
    for _ in 0..2 {
        let _ = cache.set("k", &1, None).await;
    }

    tokio::time::sleep(Duration::from_millis(150)).await;
    let calls_before = store.calls();
    assert!(cache.set("k", &1, None).await.is_err());
    assert_eq!(store.calls(), calls_before + 1);
    assert_eq!(cache.circuit_state(), CircuitState::Open);

    // Immediately rejected again
    let err = cache.set("k", &1, None).await.unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::CircuitOpen);
}

#[tokio::test]
async fn test_half_open_admits_a_single_probe() {
    let breaker = Arc::new(CircuitBreaker::new(
        "probe".to_string(),
        CircuitBreakerConfig::for_testing(),
    ));
    breaker.force_open();
    tokio::time::sleep(Duration::from_millis(80)).await;

    let slow_probe = {
        let breaker = Arc::clone(&breaker);
        tokio::spawn(async move {
            breaker
                .call(|| async {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    Ok::<_, std::io::Error>(())
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let concurrent = breaker
        .call(|| async { Ok::<_, std::io::Error>(()) })
        .await;
    assert!(matches!(
        concurrent,
        Err(CircuitBreakerError::CircuitOpen { .. })
    ));

    assert!(slow_probe.await.unwrap().is_ok());
    assert_eq!(breaker.state(), CircuitState::Closed);
}
