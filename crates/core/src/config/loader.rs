//! Configuration file loader for `rpipe.toml`.
//!
//! The file has two tables:
//! - `[redis]`: connection settings (all optional)
//! - `[pipeline]`: the aggregation group, key shape and state chain

use crate::config::error::{ConfigError, ConfigResult};
use crate::keys::KeyCodec;
use rpipe_protocol::config_models::{RedisSettings, RpipeConfig};
use std::path::Path;

/// Loads and checks the configuration at `path`.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - The file cannot be read
/// - The TOML is malformed or the `[pipeline]` table is missing
/// - The pipeline options break a key or chain invariant
///
/// # Example
///
/// ```rust,no_run
/// use rpipe_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("rpipe.toml")).await?;
/// println!("Loaded pipeline {}", config.pipeline.name);
/// # Ok(())
/// # }
/// ```
pub async fn load_config(path: &Path) -> ConfigResult<RpipeConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

    parse_config(&content, path)
}

/// Parses and checks configuration text. `path` is only used in errors.
pub fn parse_config(content: &str, path: &Path) -> ConfigResult<RpipeConfig> {
    let config: RpipeConfig = toml::from_str(content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;

    KeyCodec::new(&config.pipeline).map_err(|e| ConfigError::InvalidConfig {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(config)
}

/// Builds the connection URL for the Redis client.
///
/// An explicit `url` wins; otherwise `redis://[:password@]host:port[/db]`.
pub fn redis_url(settings: &RedisSettings) -> String {
    if let Some(url) = &settings.url {
        return url.clone();
    }

    let auth = settings
        .password
        .as_ref()
        .map(|password| format!(":{password}@"))
        .unwrap_or_default();
    let db = settings.db.map(|db| format!("/{db}")).unwrap_or_default();

    format!("redis://{auth}{}:{}{db}", settings.host, settings.port)
}

/// Hide the userinfo part of a connection URL so it can be logged.
///
/// `redis://:secret@host:6379/0` becomes `redis://***@host:6379/0`.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority = rest.split('/').next().unwrap_or_default();
    match authority.rfind('@') {
        Some(at) => format!("{scheme}://***@{}", &rest[at + 1..]),
        None => url.to_string(),
    }
}
