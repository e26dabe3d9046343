//! Configuration loading.
//!
//! Sources, lowest to highest precedence:
//! 1. built-in defaults
//! 2. global `config.toml` in the platform config directory
//! 3. `.issuetrack/config.toml` in the current directory
//! 4. `ISSUETRACK_*` environment variables
//!
//! The binary applies `--database` on top of the result.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const ENV_DATABASE_URL: &str = "ISSUETRACK_DATABASE_URL";
pub const ENV_MAX_CONNECTIONS: &str = "ISSUETRACK_MAX_CONNECTIONS";
pub const ENV_BUSY_TIMEOUT_MS: &str = "ISSUETRACK_BUSY_TIMEOUT_MS";
pub const ENV_DEFAULT_WIP_LIMIT: &str = "ISSUETRACK_DEFAULT_WIP_LIMIT";
pub const ENV_LOG_LEVEL: &str = "ISSUETRACK_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// sqlx connection URL, e.g. `sqlite:issuetrack.db?mode=rwc`.
    pub database_url: String,
    pub max_connections: u32,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    /// WIP limit for projects created without one.
    pub default_wip_limit: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:issuetrack.db?mode=rwc".to_string(),
            max_connections: 5,
            busy_timeout_ms: 5_000,
            default_wip_limit: 3,
            log_level: "info".to_string(),
        }
    }
}

/// One config file. Absent keys leave the lower layer untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigLayer {
    database_url: Option<String>,
    max_connections: Option<u32>,
    busy_timeout_ms: Option<u64>,
    default_wip_limit: Option<u32>,
    log_level: Option<String>,
}

impl Config {
    fn merge(&mut self, layer: ConfigLayer) {
        if let Some(url) = layer.database_url {
            self.database_url = url;
        }
        if let Some(n) = layer.max_connections {
            self.max_connections = n;
        }
        if let Some(ms) = layer.busy_timeout_ms {
            self.busy_timeout_ms = ms;
        }
        if let Some(limit) = layer.default_wip_limit {
            self.default_wip_limit = limit;
        }
        if let Some(level) = layer.log_level {
            self.log_level = level;
        }
    }

    /// Apply `ISSUETRACK_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if a numeric variable does not parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
        where
            T::Err: std::fmt::Display,
        {
            value
                .trim()
                .parse()
                .map_err(|e| Error::InvalidConfig(format!("Invalid {name} value '{value}': {e}")))
        }

        if let Some(value) = lookup(ENV_DATABASE_URL) {
            self.database_url = value;
        }
        if let Some(value) = lookup(ENV_MAX_CONNECTIONS) {
            self.max_connections = parse(ENV_MAX_CONNECTIONS, &value)?;
        }
        if let Some(value) = lookup(ENV_BUSY_TIMEOUT_MS) {
            self.busy_timeout_ms = parse(ENV_BUSY_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_DEFAULT_WIP_LIMIT) {
            self.default_wip_limit = parse(ENV_DEFAULT_WIP_LIMIT, &value)?;
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` for an empty database URL, a zero-sized
    /// pool, a zero busy timeout or a zero default WIP limit.
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(Error::InvalidConfig("database_url must not be empty".into()));
        }
        if self.max_connections == 0 {
            return Err(Error::InvalidConfig(
                "max_connections must be at least 1".into(),
            ));
        }
        if self.busy_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "busy_timeout_ms must be at least 1".into(),
            ));
        }
        if self.default_wip_limit == 0 {
            return Err(Error::InvalidConfig(
                "default_wip_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from all sources.
///
/// # Errors
///
/// Returns error if:
/// - A config file exists but cannot be read or is malformed TOML
/// - An environment variable holds an unparseable number
/// - The merged values fail validation
pub async fn load_config() -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            config.merge(load_toml_file(&global_path).await?);
        }
    }

    if let Ok(project_path) = project_config_path() {
        if project_path.exists() {
            config.merge(load_toml_file(&project_path).await?);
        }
    }

    config.apply_env(|name| std::env::var(name).ok())?;
    config.validate()?;
    tracing::debug!(database_url = %config.database_url, "configuration loaded");
    Ok(config)
}

fn project_config_path() -> Result<PathBuf> {
    std::env::current_dir()
        .map(|dir| dir.join(".issuetrack/config.toml"))
        .map_err(|e| Error::Io(format!("Failed to get current directory: {e}")))
}

fn global_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "issuetrack")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

async fn load_toml_file(path: &Path) -> Result<ConfigLayer> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::Io(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;

    toml::from_str(&content)
        .map_err(|e| Error::Parse(format!("Failed to parse config: {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_wip_limit, 3);
    }

    #[test]
    fn test_layer_overrides_only_present_keys() -> Result<()> {
        let mut config = Config::default();
        let layer: ConfigLayer = toml::from_str("max_connections = 8\nlog_level = \"debug\"")?;
        config.merge(layer);
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.database_url, Config::default().database_url);
        Ok(())
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result: std::result::Result<ConfigLayer, _> = toml::from_str("wip = 2");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides_files() -> Result<()> {
        let mut config = Config::default();
        config.merge(ConfigLayer {
            database_url: Some("sqlite:from-file.db".into()),
            ..ConfigLayer::default()
        });
        config.apply_env(env(&[
            (ENV_DATABASE_URL, "sqlite::memory:"),
            (ENV_DEFAULT_WIP_LIMIT, " 5 "),
        ]))?;
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.default_wip_limit, 5);
        Ok(())
    }

    #[test]
    fn test_env_bad_number() {
        let mut config = Config::default();
        let result = config.apply_env(env(&[(ENV_MAX_CONNECTIONS, "many")]));
        assert!(matches!(
            result,
            Err(Error::InvalidConfig(msg)) if msg.contains(ENV_MAX_CONNECTIONS)
        ));
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let zero_pool = Config {
            max_connections: 0,
            ..Config::default()
        };
        assert!(zero_pool.validate().is_err());

        let zero_timeout = Config {
            busy_timeout_ms: 0,
            ..Config::default()
        };
        assert!(zero_timeout.validate().is_err());

        let empty_url = Config {
            database_url: "  ".into(),
            ..Config::default()
        };
        assert!(matches!(empty_url.validate(), Err(Error::InvalidConfig(_))));

        let zero_wip = Config {
            default_wip_limit: 0,
            ..Config::default()
        };
        assert!(matches!(zero_wip.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_project_file_layer_is_merged() -> Result<()> {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir()?;
            let path = dir.path().join("config.toml");
            tokio::fs::write(&path, b"default_wip_limit = 2\nbusy_timeout_ms = 250\n").await?;

            let mut config = Config::default();
            config.merge(load_toml_file(&path).await?);
            assert_eq!(config.default_wip_limit, 2);
            assert_eq!(config.busy_timeout_ms, 250);
            assert_eq!(config.max_connections, 5);

            let missing = load_toml_file(&dir.path().join("absent.toml")).await;
            assert!(matches!(missing, Err(Error::Io(_))));
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_malformed_toml_returns_parse_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, b"database_url = \n [[[").await?;

        let result = load_toml_file(&path).await;
        assert!(matches!(result, Err(Error::Parse(_))));
        Ok(())
    }
}
