//! Configuration Loader
//!
//! Layers cache settings with the `config` crate: serde defaults, then the
//! optional `config/metrics-cache.{toml,yaml,json}` file (or an explicit
//! path), then environment variables such as `METRICS_CACHE_BACKEND` or
//! `METRICS_CACHE_REDIS__HOST`.

use super::error::ConfigResult;
use super::CacheSettings;
use config::{Config, Environment, File};
use std::path::Path;
use tracing::debug;

/// Basename probed when no explicit configuration file is given
pub const DEFAULT_CONFIG_BASENAME: &str = "config/metrics-cache";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "METRICS_CACHE";

/// Load and validate settings.
///
/// An explicit `config_file` must exist; the default file is optional.
pub fn load_settings(config_file: Option<&Path>) -> ConfigResult<CacheSettings> {
    let mut builder =
        Config::builder().add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        debug!(path = %path.display(), "Loading cache configuration file");
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("redis.cluster_nodes"),
    );

    let settings: CacheSettings = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}
