use crate::ports::{AppConfig, ConfigError, ConfigResult, ConfigStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

const APP_DIR: &str = "board-relay";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    board_id: Option<i64>,
    base_url: Option<String>,
    http_timeout_secs: Option<u64>,
    retry_count: Option<u32>,
    retry_wait_ms: Option<u64>,
    max_retry_elapsed_secs: Option<u64>,
    tasks_limit: Option<usize>,
    check_interval_secs: Option<u64>,
    verification_delay_secs: Option<u64>,
    operator_id: Option<i64>,
}

impl ConfigFile {
    fn into_config(self, api_token: Option<String>) -> AppConfig {
        let defaults = AppConfig::default();
        AppConfig {
            api_token,
            board_id: self.board_id,
            base_url: self.base_url.unwrap_or(defaults.base_url),
            http_timeout: self
                .http_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            retry_count: self.retry_count.unwrap_or(defaults.retry_count),
            retry_wait: self
                .retry_wait_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_wait),
            max_retry_elapsed: self
                .max_retry_elapsed_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_retry_elapsed),
            tasks_limit: self.tasks_limit.unwrap_or(defaults.tasks_limit),
            check_interval: self
                .check_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.check_interval),
            verification_delay: self
                .verification_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.verification_delay),
            operator_id: self.operator_id.unwrap_or(defaults.operator_id),
        }
    }

    fn from_config(config: &AppConfig) -> Self {
        Self {
            board_id: config.board_id,
            base_url: Some(config.base_url.clone()),
            http_timeout_secs: Some(config.http_timeout.as_secs()),
            retry_count: Some(config.retry_count),
            retry_wait_ms: Some(config.retry_wait.as_millis() as u64),
            max_retry_elapsed_secs: Some(config.max_retry_elapsed.as_secs()),
            tasks_limit: Some(config.tasks_limit),
            check_interval_secs: Some(config.check_interval.as_secs()),
            verification_delay_secs: Some(config.verification_delay.as_secs()),
            operator_id: Some(config.operator_id),
        }
    }
}

pub struct FileConfigStore {
    config_dir: PathBuf,
    keyring_service: Option<String>,
}

impl FileConfigStore {
    pub fn new() -> ConfigResult<Self> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::ReadError("Cannot determine config directory".to_string())
        })?;

        Ok(Self {
            config_dir: config_dir.join(APP_DIR),
            keyring_service: Some(APP_DIR.to_string()),
        })
    }

    /// A store rooted at `dir` that keeps the token in a file only.
    pub fn at(dir: impl AsRef<Path>) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
            keyring_service: None,
        }
    }

    fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    fn token_file_path(&self) -> PathBuf {
        self.config_dir.join(".token")
    }

    async fn ensure_config_dir(&self) -> ConfigResult<()> {
        fs::create_dir_all(&self.config_dir)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    async fn get_token_from_file(&self) -> ConfigResult<Option<String>> {
        match fs::read_to_string(self.token_file_path()).await {
            Ok(token) if !token.trim().is_empty() => Ok(Some(token.trim().to_string())),
            _ => Ok(None),
        }
    }

    async fn set_token_in_file(&self, token: &str) -> ConfigResult<()> {
        self.ensure_config_dir().await?;
        let token_path = self.token_file_path();
        fs::write(&token_path, token)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&token_path)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&token_path, perms)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        Ok(())
    }

    fn keyring_entry(&self) -> Option<keyring::Entry> {
        let service = self.keyring_service.as_ref()?;
        match keyring::Entry::new(service, "api_token") {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Keyring not available, using file storage: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn load_config(&self) -> ConfigResult<AppConfig> {
        let api_token = self.get_api_token().await?;

        let content = match fs::read_to_string(self.config_path()).await {
            Ok(content) => content,
            Err(_) => {
                tracing::debug!("No config file at {}, using defaults", self.config_path().display());
                return Ok(ConfigFile::default().into_config(api_token));
            }
        };

        let config_file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        Ok(config_file.into_config(api_token))
    }

    async fn save_config(&self, config: &AppConfig) -> ConfigResult<()> {
        self.ensure_config_dir().await?;

        let content = serde_json::to_string_pretty(&ConfigFile::from_config(config))
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        fs::write(self.config_path(), content)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        // The token never goes into config.json
        if let Some(token) = &config.api_token {
            self.set_api_token(token).await?;
        }

        Ok(())
    }

    async fn get_api_token(&self) -> ConfigResult<Option<String>> {
        if let Some(entry) = self.keyring_entry() {
            match entry.get_password() {
                Ok(token) => return Ok(Some(token)),
                Err(keyring::Error::NoEntry) => {}
                Err(e) => {
                    tracing::warn!("Keyring read failed, falling back to file storage: {}", e);
                }
            }
        }

        self.get_token_from_file().await
    }

    async fn set_api_token(&self, token: &str) -> ConfigResult<()> {
        if let Some(entry) = self.keyring_entry() {
            match entry.set_password(token) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!("Failed to store in keyring, falling back to file storage: {}", e);
                }
            }
        }

        self.set_token_in_file(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("board-relay-test-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let store = FileConfigStore::at(scratch_dir());
        let config = store.load_config().await.unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = scratch_dir();
        let store = FileConfigStore::at(&dir);

        let config = AppConfig {
            api_token: Some("secret".to_string()),
            board_id: Some(17),
            retry_count: 5,
            verification_delay: Duration::from_secs(30),
            ..Default::default()
        };
        store.save_config(&config).await.unwrap();

        let on_disk = fs::read_to_string(dir.join("config.json")).await.unwrap();
        assert!(!on_disk.contains("secret"));

        let loaded = store.load_config().await.unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_invalid_file_is_reported() {
        let dir = scratch_dir();
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join("config.json"), "{not json").await.unwrap();

        let err = FileConfigStore::at(&dir).load_config().await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat(_)));

        let _ = fs::remove_dir_all(&dir).await;
    }
}
