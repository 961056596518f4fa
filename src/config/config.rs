use crate::api_client::{DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use crate::utils::app_paths::AppPaths;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides `api.base_url`, e.g. to point at a local mirror
pub const API_URL_ENV: &str = "OPENLIBRARY_API_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Open Library root; `/search.json` is appended
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    pub user_agent: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file (defaults to the platform data directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set: "error", "warn", "info", "debug", "trace"
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location, writing the defaults there on first use
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            default_config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join(AppPaths::APP_NAME).join("config.toml"))
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.store.database_path {
            Some(path) => Ok(path.clone()),
            None => AppPaths::database_file(),
        }
    }

    /// Default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# openlibrary-sync configuration
# Location: ~/.config/openlibrary-sync/config.toml (Linux)
#           ~/Library/Application Support/openlibrary-sync/config.toml (macOS)
#           %APPDATA%\openlibrary-sync\config.toml (Windows)

[api]
# Open Library root; /search.json is appended.
# OPENLIBRARY_API_URL overrides this value.
base_url = "https://openlibrary.org"

# Request timeout in seconds. Failed requests are not retried.
timeout_secs = 30

user_agent = "openlibrary-sync/0.1"

[store]
# SQLite database holding books and author terms
# (leave commented to use the platform data directory)
# database_path = "/path/to/library.db"

[logging]
# Used when RUST_LOG is not set: "error", "warn", "info", "debug", "trace"
level = "info"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "https://openlibrary.org");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
        assert!(config.store.database_path.is_none());
    }

    #[test]
    fn test_commented_template_matches_defaults() {
        let parsed: Config = toml::from_str(&Config::create_default_with_comments()).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.api.base_url, defaults.api.base_url);
        assert_eq!(parsed.api.timeout_secs, defaults.api.timeout_secs);
        assert_eq!(parsed.api.user_agent, defaults.api.user_agent);
        assert_eq!(parsed.logging.level, defaults.logging.level);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api]\ntimeout_secs = 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.store.database_path = Some(dir.path().join("books.db"));
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.store.database_path, config.store.database_path);
        assert_eq!(reloaded.database_path().unwrap(), dir.path().join("books.db"));
    }
}
