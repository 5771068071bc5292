//! Runtime configuration, resolved once at startup and passed down explicitly.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, StatusBotError};
use crate::retry::RetryConfig;
use crate::services::status_api::{DEFAULT_MODES, Mode};

pub const DEFAULT_TFL_API_URL: &str = "https://api.tfl.gov.uk";
pub const DEFAULT_THREADS_API_URL: &str = "https://graph.threads.net";
pub const DEFAULT_THREADS_API_VERSION: &str = "v1.0";
pub const DEFAULT_DB_PATH: &str = "tfl_line_status.db";
pub const DEFAULT_PUBLISH_DELAY: Duration = Duration::from_secs(5);

/// Credentials and endpoint for the posting service.
#[derive(Clone)]
pub struct ThreadsConfig {
    pub base_url: String,
    pub api_version: String,
    pub user_id: String,
    pub token: String,
    /// Pause between creating a post and publishing it.
    pub publish_delay: Duration,
    pub retry: RetryConfig,
}

impl std::fmt::Debug for ThreadsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadsConfig")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .field("publish_delay", &self.publish_delay)
            .field("retry", &self.retry)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tfl_base_url: String,
    pub modes: Vec<Mode>,
    pub db_path: PathBuf,
    /// `None` when no credentials are present; only dry runs are possible then.
    pub threads: Option<ThreadsConfig>,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first if a
    /// `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let publish_delay = match get("PUBLISH_DELAY_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|e| {
                StatusBotError::Config(format!("PUBLISH_DELAY_SECS must be an integer: {e}"))
            })?),
            None => DEFAULT_PUBLISH_DELAY,
        };

        let threads = match (get("THREADS_API_TOKEN"), get("THREADS_USER_ID")) {
            (Some(token), Some(user_id)) => Some(ThreadsConfig {
                base_url: get("THREADS_API_URL")
                    .unwrap_or_else(|| DEFAULT_THREADS_API_URL.to_string()),
                api_version: get("THREADS_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_THREADS_API_VERSION.to_string()),
                user_id,
                token,
                publish_delay,
                retry: RetryConfig::default(),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(StatusBotError::Config(
                    "THREADS_API_TOKEN is set but THREADS_USER_ID is missing".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(StatusBotError::Config(
                    "THREADS_USER_ID is set but THREADS_API_TOKEN is missing".to_string(),
                ));
            }
        };

        Ok(Self {
            tfl_base_url: get("TFL_API_URL").unwrap_or_else(|| DEFAULT_TFL_API_URL.to_string()),
            modes: DEFAULT_MODES.to_vec(),
            db_path: get("STATUS_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            threads,
        })
    }

    /// Posting credentials, or a config error naming what is missing.
    pub fn require_threads(&self) -> Result<&ThreadsConfig> {
        self.threads.as_ref().ok_or_else(|| {
            StatusBotError::Config(
                "THREADS_API_TOKEN and THREADS_USER_ID must be set to publish posts".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_credentials() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.tfl_base_url, DEFAULT_TFL_API_URL);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.modes, DEFAULT_MODES.to_vec());
        assert!(config.threads.is_none());
        assert!(config.require_threads().is_err());
    }

    #[test]
    fn test_threads_config_from_env() {
        let config = Config::from_lookup(lookup(&[
            ("THREADS_API_TOKEN", "tok"),
            ("THREADS_USER_ID", "42"),
            ("PUBLISH_DELAY_SECS", "1"),
        ]))
        .unwrap();

        let threads = config.require_threads().unwrap();
        assert_eq!(threads.user_id, "42");
        assert_eq!(threads.token, "tok");
        assert_eq!(threads.base_url, DEFAULT_THREADS_API_URL);
        assert_eq!(threads.api_version, DEFAULT_THREADS_API_VERSION);
        assert_eq!(threads.publish_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_half_configured_credentials_are_rejected() {
        let result = Config::from_lookup(lookup(&[("THREADS_API_TOKEN", "tok")]));
        assert!(matches!(result, Err(StatusBotError::Config(_))));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = Config::from_lookup(lookup(&[
            ("THREADS_API_TOKEN", " "),
            ("THREADS_USER_ID", ""),
            ("STATUS_DB_PATH", ""),
        ]))
        .unwrap();
        assert!(config.threads.is_none());
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
    }

    #[test]
    fn test_bad_publish_delay() {
        let result = Config::from_lookup(lookup(&[("PUBLISH_DELAY_SECS", "soon")]));
        assert!(matches!(result, Err(StatusBotError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = Config::from_lookup(lookup(&[
            ("THREADS_API_TOKEN", "super-secret"),
            ("THREADS_USER_ID", "42"),
        ]))
        .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
    }
}
