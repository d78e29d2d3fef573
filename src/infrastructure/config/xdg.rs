//! TOML settings file under the platform config directory

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::application::ports::ConfigStore;
use crate::domain::config::EngineConfig;
use crate::domain::error::ConfigError;

const APP_DIR: &str = "voicenote";
const FILE_NAME: &str = "config.toml";

/// `$XDG_CONFIG_HOME/voicenote/config.toml`, or the platform equivalent
fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join(APP_DIR)
        .join(FILE_NAME)
}

/// Settings stored as a flat TOML table
pub struct XdgConfigStore {
    path: PathBuf,
}

impl XdgConfigStore {
    pub fn new() -> Self {
        Self::with_path(default_config_path())
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse and validate file contents
    fn decode(content: &str) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn encode(config: &EngineConfig) -> Result<String, ConfigError> {
        toml::to_string_pretty(config).map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    /// Sibling file the new contents are staged in before the rename
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Default for XdgConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn write_atomically(staging: &Path, target: &Path, content: &str) -> Result<(), ConfigError> {
    let write_err = |e: std::io::Error| ConfigError::WriteError(format!("{}: {}", target.display(), e));

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    fs::write(staging, content).await.map_err(write_err)?;
    if let Err(e) = fs::rename(staging, target).await {
        let _ = fs::remove_file(staging).await;
        return Err(write_err(e));
    }
    Ok(())
}

#[async_trait]
impl ConfigStore for XdgConfigStore {
    async fn load(&self) -> Result<EngineConfig, ConfigError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no config file, using built-in settings");
                return Ok(EngineConfig::empty());
            }
            Err(e) => return Err(ConfigError::ReadError(e.to_string())),
        };
        Self::decode(&content)
    }

    async fn save(&self, config: &EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let content = Self::encode(config)?;
        write_atomically(&self.staging_path(), &self.path, &content).await?;
        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> XdgConfigStore {
        XdgConfigStore::with_path(dir.path().join("nested").join(FILE_NAME))
    }

    #[test]
    fn default_path_ends_in_app_dir() {
        let path = XdgConfigStore::new().path();
        assert!(path.ends_with("voicenote/config.toml"));
    }

    #[test]
    fn decodes_flat_table() {
        let config = XdgConfigStore::decode(
            r#"
preset = "low"
metering_interval = "50ms"
cache_max_age = "3d"
"#,
        )
        .unwrap();
        assert_eq!(config.preset.as_deref(), Some("low"));
        assert_eq!(config.metering_interval.as_deref(), Some("50ms"));
        assert_eq!(config.cache_max_age.as_deref(), Some("3d"));
        assert_eq!(config.data_dir, None);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = XdgConfigStore::decode("preset = [").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[tokio::test]
    async fn load_rejects_bad_interval() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(dir.path().join("nested")).await.unwrap();
        fs::write(store.path(), "metering_interval = \"every so often\"\n")
            .await
            .unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { key, .. } if key == "metering_interval"));
    }

    #[tokio::test]
    async fn load_rejects_unknown_preset() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(dir.path().join("nested")).await.unwrap();
        fs::write(store.path(), "preset = \"lossless\"\n").await.unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { key, .. } if key == "preset"));
    }

    #[tokio::test]
    async fn save_refuses_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let config = EngineConfig {
            cache_max_age: Some("forever".into()),
            ..EngineConfig::empty()
        };

        assert!(store.save(&config).await.is_err());
        assert!(!store.exists());
    }

    #[tokio::test]
    async fn update_persists_without_leftover_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let config = store.update("existence_retry", "500ms").await.unwrap();
        assert_eq!(config.existence_retry.as_deref(), Some("500ms"));
        assert_eq!(store.load().await.unwrap(), config);
        assert!(!store.staging_path().exists());
    }

    #[tokio::test]
    async fn init_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        assert_eq!(store.load().await.unwrap(), EngineConfig::empty());
        store.init().await.unwrap();
        assert_eq!(store.load().await.unwrap(), EngineConfig::defaults());

        let err = store.init().await.unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyExists(_)));
    }
}
