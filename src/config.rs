//! Runtime configuration at ~/.luna/config.json.
//!
//! Every field is optional in the file; missing fields fall back to defaults.
//! A missing file is not an error. CLI flags override file values.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::geocoder::{DEFAULT_NOMINATIM_URL, DEFAULT_USER_AGENT};
use crate::location::AuthorizationModel;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot parse config {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("Invalid log level '{0}'")]
    LogLevel(String),
    #[error("Invalid timeout_secs {0}: must be at least 1")]
    Timeout(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LunaConfig {
    pub nominatim_url: String,
    pub user_agent: String,
    /// Preferred language for place names (e.g. "en", "sv").
    pub language: Option<String>,
    pub timeout_secs: u64,
    /// Use the built-in dataset instead of Nominatim.
    pub offline: bool,
    pub authorization: AuthorizationModel,
    pub log_level: String,
}

impl Default for LunaConfig {
    fn default() -> Self {
        Self {
            nominatim_url: DEFAULT_NOMINATIM_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            language: None,
            timeout_secs: 10,
            offline: false,
            authorization: AuthorizationModel::default(),
            log_level: "info".into(),
        }
    }
}

impl LunaConfig {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read { path: path.to_path_buf(), source });
            }
        };
        let config: Self = serde_json::from_str(&data).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Timeout(self.timeout_secs));
        }
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".luna")
            .join("config.json")
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level).map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = LunaConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(cfg, LunaConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"offline": true, "authorization": "unrestricted", "language": "sv"}"#)
            .unwrap();

        let cfg = LunaConfig::load_from(&path).unwrap();
        assert!(cfg.offline);
        assert_eq!(cfg.authorization, AuthorizationModel::Unrestricted);
        assert_eq!(cfg.language.as_deref(), Some("sv"));
        assert_eq!(cfg.nominatim_url, DEFAULT_NOMINATIM_URL);
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(LunaConfig::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"timeout_secs": 0}"#).unwrap();
        assert!(matches!(LunaConfig::load_from(&path), Err(ConfigError::Timeout(0))));
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let cfg = LunaConfig { timeout_secs: 3, log_level: "debug".into(), ..LunaConfig::default() };
        fs::write(&path, serde_json::to_string_pretty(&cfg).unwrap()).unwrap();
        assert_eq!(LunaConfig::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn test_level_filter() {
        let mut cfg = LunaConfig::default();
        assert_eq!(cfg.level_filter().unwrap(), LevelFilter::Info);
        cfg.log_level = "TRACE".into();
        assert_eq!(cfg.level_filter().unwrap(), LevelFilter::Trace);
        cfg.log_level = "loud".into();
        assert!(matches!(cfg.level_filter(), Err(ConfigError::LogLevel(_))));
    }
}
