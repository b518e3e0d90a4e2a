//! Command handlers. Each handler performs a single engine call.

pub mod buckets;
pub mod inspect;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rpipe_core::config::loader::{load_config, redact_url, redis_url};
use rpipe_core::keys::KeyCodec;
use rpipe_core::store::RedisStore;
use rpipe_core::PipeEngine;
use rpipe_protocol::config_models::RpipeConfig;

/// Where the commands read their configuration and which server they talk to.
pub struct Target {
    pub config_path: PathBuf,
    pub redis_url: Option<String>,
}

impl Target {
    async fn config(&self) -> Result<RpipeConfig> {
        load_config(&self.config_path)
            .await
            .with_context(|| format!("Failed to load config: {}", self.config_path.display()))
    }

    /// Key codec for commands that never touch the store.
    async fn codec(&self) -> Result<KeyCodec> {
        let config = self.config().await?;
        Ok(KeyCodec::new(&config.pipeline)?)
    }

    /// Engine connected to the configured Redis server.
    async fn engine(&self) -> Result<PipeEngine> {
        let config = self.config().await?;
        let url = self
            .redis_url
            .clone()
            .unwrap_or_else(|| redis_url(&config.redis));

        let store = RedisStore::connect(&url)
            .await
            .with_context(|| format!("Failed to connect to {}", redact_url(&url)))?;
        tracing::debug!(pipeline = %config.pipeline.name, "engine ready");

        Ok(PipeEngine::new(Arc::new(store), config.pipeline)?)
    }
}
