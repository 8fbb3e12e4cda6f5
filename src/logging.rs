//! # Structured Logging Module
//!
//! Environment-aware structured logging. Human-readable output in
//! development and test, JSON lines in production. `RUST_LOG` overrides the
//! environment's default level.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = detect_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let console = if environment == crate::config::PRODUCTION_ENVIRONMENT {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .boxed()
        };

        // A host application may already own the global subscriber
        if tracing_subscriber::registry()
            .with(console.with_filter(filter))
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - keeping it");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
pub fn detect_environment() -> String {
    std::env::var("METRICS_CACHE_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .or_else(|_| std::env::var("RUST_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log a cache operation failure with full context
pub fn log_cache_failure(operation: &str, target: &str, error: &dyn std::error::Error, absorbed: bool) {
    if absorbed {
        tracing::warn!(
            operation = %operation,
            target_key = %target,
            error = %error,
            absorbed = true,
            timestamp = %Utc::now().to_rfc3339(),
            "Cache read degraded, treating as miss"
        );
    } else {
        tracing::error!(
            operation = %operation,
            target_key = %target,
            error = %error,
            absorbed = false,
            timestamp = %Utc::now().to_rfc3339(),
            "Cache operation failed"
        );
    }
}
