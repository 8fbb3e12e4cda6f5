//! Configuration error types

use thiserror::Error;

/// Errors raised while loading or validating cache settings
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The layered sources could not be merged or deserialized
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),

    /// A setting holds a value the cache cannot run with
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigurationError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigurationError>;
