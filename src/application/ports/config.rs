//! Persisted engine settings

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::EngineConfig;
use crate::domain::error::ConfigError;

/// Where engine settings live between runs.
///
/// Implementations hand out only validated configs: a stored duration or
/// preset that does not parse is a [`ConfigError::ValidationError`] at load
/// time rather than a silent fallback later on.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Stored settings; an empty config when nothing has been saved yet
    async fn load(&self) -> Result<EngineConfig, ConfigError>;

    async fn save(&self, config: &EngineConfig) -> Result<(), ConfigError>;

    fn path(&self) -> PathBuf;

    fn exists(&self) -> bool;

    /// Persist the built-in defaults. Refuses to overwrite existing settings.
    async fn init(&self) -> Result<(), ConfigError> {
        if self.exists() {
            return Err(ConfigError::AlreadyExists(self.path().display().to_string()));
        }
        self.save(&EngineConfig::defaults()).await
    }

    /// Change a single key and persist the result.
    /// Nothing is written when the value is rejected.
    async fn update(&self, key: &str, value: &str) -> Result<EngineConfig, ConfigError> {
        let mut config = self.load().await?;
        config.set(key, value)?;
        self.save(&config).await?;
        Ok(config)
    }
}
