mod parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::*;
use crate::errors::Error;

pub use parser::load_config;

/// Runtime configuration, optionally loaded from a YAML file
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Maximum number of task fetches running concurrently
    pub workers: usize,
    /// Attempts made for each upstream call before giving up
    pub retry_attempts: usize,
    /// Page size used for the recent (inactive) task history listing
    pub history_page_size: u32,
    /// HTTP timeout for upstream calls, as a humantime string (e.g. "30s")
    pub request_timeout: String,
    /// Cache store settings
    pub cache: CacheConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Named sets of environment variables selectable with `-x <num>`
    pub env_presets: BTreeMap<u32, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        let mut env_presets = BTreeMap::new();
        env_presets.insert(
            1,
            PRESET_TASK_HOST_PORT.iter().map(|s| s.to_string()).collect(),
        );

        Config {
            workers: DEFAULT_WORKERS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT.to_string(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            env_presets,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Result<Duration, Error> {
        parse_duration(&self.request_timeout)
    }

    /// Looks up an environment preset by number
    pub fn env_preset(&self, preset: u32) -> Option<&[String]> {
        self.env_presets.get(&preset).map(|v| v.as_slice())
    }
}

/// How the cache file is prepared at startup
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Keep the file and migrate it; rebuild only when the schema drifted
    #[default]
    Groom,
    /// Delete the file and build it from scratch on every run
    Recreate,
}

/// Cache store configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether records are persisted at all
    pub enabled: bool,
    /// Database file; defaults to `cygnus.db` in the temporary directory
    pub path: Option<PathBuf>,
    pub policy: CachePolicy,
    /// Freshness window for request rows, as a humantime string
    pub freshness_window: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            path: None,
            policy: CachePolicy::default(),
            freshness_window: DEFAULT_FRESHNESS_WINDOW.to_string(),
        }
    }
}

impl CacheConfig {
    /// Resolves the database location: `CYGNUS_CACHE_PATH`, then the configured
    /// path, then the temporary directory.
    pub fn resolve_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var(CACHE_PATH_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }
        self.path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(CACHE_FILE_NAME))
    }

    pub fn freshness_window(&self) -> Result<Duration, Error> {
        parse_duration(&self.freshness_window)
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "cygnus=debug"
    pub level: String,
    /// Directory for daily rotating log files; stderr only when unset
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            directory: None,
        }
    }
}

fn parse_duration(value: &str) -> Result<Duration, Error> {
    humantime::parse_duration(value).map_err(|source| Error::DurationError {
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.workers, 16);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.history_page_size, 10);
        assert_eq!(config.cache.policy, CachePolicy::Groom);
        assert_eq!(
            config.cache.freshness_window().unwrap(),
            Duration::from_secs(1)
        );
        assert_eq!(
            config.env_preset(1).unwrap(),
            &["TASK_HOST".to_string(), "PORT0".to_string()]
        );
        assert!(config.env_preset(2).is_none());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "workers: 4\ncache:\n  policy: recreate\nenv_presets:\n  2: [HOST]\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.cache.policy, CachePolicy::Recreate);
        assert!(config.cache.enabled);
        assert_eq!(config.env_preset(2).unwrap(), &["HOST".to_string()]);
    }

    #[test]
    fn bad_duration_is_reported() {
        let config = Config {
            request_timeout: "soon".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.request_timeout(),
            Err(Error::DurationError { .. })
        ));
    }
}
