use std::path::PathBuf;
use std::time::Duration as StdDuration;

use tracing::warn;

use crate::services::activity_service::DEFAULT_FEED_LIMIT;

const ENV_DB_PATH: &str = "GREENLEAD_DB_PATH";
const ENV_LOG_DIR: &str = "GREENLEAD_LOG_DIR";
const ENV_WEBHOOK_URL: &str = "GREENLEAD_NOTIFY_WEBHOOK_URL";
const ENV_WEBHOOK_TIMEOUT: &str = "GREENLEAD_NOTIFY_TIMEOUT_SECS";
const ENV_FEED_LIMIT: &str = "GREENLEAD_ACTIVITY_FEED_LIMIT";

const DEFAULT_DB_PATH: &str = "greenlead.sqlite";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct CrmConfig {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    /// When unset, notifications are only written to the log.
    pub notify_webhook_url: Option<String>,
    pub notify_timeout: StdDuration,
    pub activity_feed_limit: usize,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            notify_webhook_url: None,
            notify_timeout: StdDuration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECS),
            activity_feed_limit: DEFAULT_FEED_LIMIT,
        }
    }
}

impl CrmConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unparsable numbers fall back to
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let notify_timeout = parse_number(ENV_WEBHOOK_TIMEOUT, non_empty(ENV_WEBHOOK_TIMEOUT))
            .filter(|secs: &u64| *secs > 0)
            .map(StdDuration::from_secs)
            .unwrap_or(defaults.notify_timeout);
        let activity_feed_limit = parse_number(ENV_FEED_LIMIT, non_empty(ENV_FEED_LIMIT))
            .filter(|limit: &usize| *limit > 0)
            .unwrap_or(defaults.activity_feed_limit);

        Self {
            db_path: non_empty(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_dir: non_empty(ENV_LOG_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            notify_webhook_url: non_empty(ENV_WEBHOOK_URL),
            notify_timeout,
            activity_feed_limit,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(target: "crm::config", %key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}
