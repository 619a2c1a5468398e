use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    ReadError(String),

    #[error("Failed to write configuration: {0}")]
    WriteError(String),

    #[error("Invalid configuration format: {0}")]
    InvalidFormat(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

pub const DEFAULT_BASE_URL: &str = "https://yougile.com";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_token: Option<String>,
    pub board_id: Option<i64>,
    pub base_url: String,
    pub http_timeout: Duration,
    pub retry_count: u32,
    pub retry_wait: Duration,
    pub max_retry_elapsed: Duration,
    pub tasks_limit: usize,
    pub check_interval: Duration,
    pub verification_delay: Duration,
    /// Chat identity used for tasks submitted from the command line.
    pub operator_id: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            board_id: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(30),
            retry_count: 3,
            retry_wait: Duration::from_millis(500),
            max_retry_elapsed: Duration::from_secs(10),
            tasks_limit: 100,
            check_interval: Duration::from_secs(5 * 60),
            verification_delay: Duration::from_secs(2 * 60),
            operator_id: 0,
        }
    }
}

impl AppConfig {
    /// Applies `BOARD_*` overrides from `lookup`. Values that don't parse, or
    /// that are not positive, leave the current setting alone.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("BOARD_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.api_token = Some(token.trim().to_string());
        }
        if let Some(board) = positive(&lookup, "BOARD_ID") {
            self.board_id = Some(board);
        }
        if let Some(count) = positive(&lookup, "BOARD_RETRY_COUNT") {
            self.retry_count = count as u32;
        }
        if let Some(ms) = positive(&lookup, "BOARD_RETRY_WAIT_MS") {
            self.retry_wait = Duration::from_millis(ms as u64);
        }
        if let Some(secs) = positive(&lookup, "BOARD_MAX_RETRY_ELAPSED_SEC") {
            self.max_retry_elapsed = Duration::from_secs(secs as u64);
        }
        if let Some(secs) = positive(&lookup, "BOARD_HTTP_TIMEOUT_SEC") {
            self.http_timeout = Duration::from_secs(secs as u64);
        }
    }
}

fn positive<F>(lookup: &F, key: &str) -> Option<i64>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load_config(&self) -> ConfigResult<AppConfig>;
    async fn save_config(&self, config: &AppConfig) -> ConfigResult<()>;
    async fn get_api_token(&self) -> ConfigResult<Option<String>>;
    async fn set_api_token(&self, token: &str) -> ConfigResult<()>;
}
