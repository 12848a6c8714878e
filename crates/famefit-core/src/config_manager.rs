//! Config file management.
//!
//! Stores the configuration as a JSON file in the platform config directory.

use crate::config::AppConfig;
use crate::error::CoreError;
use directories::ProjectDirs;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Config file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Config manager
///
/// Loads and saves the config file and applies runtime changes.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a manager backed by the platform default config path.
    ///
    /// Writes a default config file if none exists.
    pub fn new() -> Result<Self, CoreError> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE_NAME);
        Self::with_path(config_path)
    }

    /// Create a manager backed by `config_path`
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Config(format!(
                        "failed to create config directory {}: {e}",
                        parent.display()
                    ))
                })?;
                info!("created config directory: {}", parent.display());
            }
        }

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = AppConfig::default_config();
            Self::save_to_file(&config_path, &default_config)?;
            info!("wrote default config file: {}", config_path.display());
            default_config
        };
        config.validate()?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Current config (cloned)
    pub fn get(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// Replace the config and persist it
    pub fn update(&self, new_config: AppConfig) -> Result<(), CoreError> {
        new_config.validate()?;
        Self::save_to_file(&self.config_path, &new_config)?;
        *self.config.write() = new_config;
        debug!("config saved: {}", self.config_path.display());
        Ok(())
    }

    /// Modify selected fields and persist
    pub fn update_with<F>(&self, updater: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.get();
        updater(&mut config);
        self.update(config.clone())?;
        Ok(config)
    }

    /// Config file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Re-read the config file
    pub fn reload(&self) -> Result<(), CoreError> {
        let config = Self::load_from_file(&self.config_path)?;
        config.validate()?;
        *self.config.write() = config;
        info!("config reloaded");
        Ok(())
    }

    /// Platform config directory
    ///
    /// - macOS: `~/Library/Application Support/fit.famefit.relay/`
    /// - Windows: `%APPDATA%\famefit\relay\config\`
    /// - Linux: `~/.config/relay/`
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        ProjectDirs::from("fit", "famefit", "relay")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| CoreError::Config("no home directory for config".to_string()))
    }

    fn load_from_file(path: &Path) -> Result<AppConfig, CoreError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("failed to read config {}: {e}", path.display()))
        })?;

        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            CoreError::Config(format!("failed to parse config {}: {e}", path.display()))
        })?;

        debug!("config loaded: {}", path.display());
        Ok(config)
    }

    fn save_to_file(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(config)?;

        fs::write(path, content).map_err(|e| {
            CoreError::Config(format!("failed to write config {}: {e}", path.display()))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        assert!(config_path.exists());
        assert_eq!(manager.get().relay.interval_secs, 30);
    }

    #[test]
    fn update_and_persist_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        manager
            .update_with(|c| {
                c.relay.interval_secs = 15;
                c.relay.pending_capacity = 20;
            })
            .unwrap();

        let reopened = ConfigManager::with_path(config_path).unwrap();
        let config = reopened.get();
        assert_eq!(config.relay.interval_secs, 15);
        assert_eq!(config.relay.pending_capacity, 20);
    }

    #[test]
    fn invalid_update_is_rejected_and_not_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        let result = manager.update_with(|c| c.relay.interval_secs = 0);
        assert!(result.is_err());

        assert_eq!(manager.get().relay.interval_secs, 30);
        let reopened = ConfigManager::with_path(config_path).unwrap();
        assert_eq!(reopened.get().relay.interval_secs, 30);
    }

    #[test]
    fn reload_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let manager = ConfigManager::with_path(config_path.clone()).unwrap();

        let mut config = manager.get();
        config.relay.unreachable_threshold = 8;
        fs::write(&config_path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        manager.reload().unwrap();
        assert_eq!(manager.get().relay.unreachable_threshold, 8);
    }

    #[test]
    fn corrupt_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "{ not json").unwrap();

        let err = ConfigManager::with_path(config_path).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }
}
