//! Configuration file support for Liftlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/liftlog/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub backend: BackendConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Upper bound for `rest_seconds` (24 hours)
pub const MAX_REST_SECONDS: i64 = 24 * 60 * 60;

/// Session timing and input limits
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_rest_seconds")]
    pub rest_seconds: i64,

    #[serde(default = "default_weight_increment")]
    pub weight_increment: f64,

    #[serde(default = "default_max_weight")]
    pub max_weight: f64,

    #[serde(default = "default_max_reps")]
    pub max_reps: u32,

    /// Used when no PR exists for the upcoming set
    #[serde(default = "default_weight")]
    pub default_weight: f64,

    #[serde(default = "default_reps")]
    pub default_reps: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rest_seconds: default_rest_seconds(),
            weight_increment: default_weight_increment(),
            max_weight: default_max_weight(),
            max_reps: default_max_reps(),
            default_weight: default_weight(),
            default_reps: default_reps(),
        }
    }
}

impl SessionConfig {
    /// Check that limits are usable
    pub fn validate(&self) -> Result<()> {
        if self.rest_seconds <= 0 || self.rest_seconds > MAX_REST_SECONDS {
            return Err(Error::Config(format!(
                "rest_seconds must be between 1 and {}",
                MAX_REST_SECONDS
            )));
        }
        if !(self.weight_increment.is_finite() && self.weight_increment > 0.0) {
            return Err(Error::Config("weight_increment must be positive".into()));
        }
        if !(self.max_weight.is_finite() && self.max_weight >= 0.0) {
            return Err(Error::Config("max_weight must be non-negative".into()));
        }
        if self.max_reps == 0 {
            return Err(Error::Config("max_reps must be at least 1".into()));
        }
        if self.default_weight < 0.0 || self.default_weight > self.max_weight {
            return Err(Error::Config(format!(
                "default_weight {} outside 0..={}",
                self.default_weight, self.max_weight
            )));
        }
        if self.default_reps == 0 || self.default_reps > self.max_reps {
            return Err(Error::Config(format!(
                "default_reps {} outside 1..={}",
                self.default_reps, self.max_reps
            )));
        }
        Ok(())
    }
}

/// Which collaborator stores workouts and answers PR queries
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// JSONL workout log under the data directory
    #[default]
    Local,
    /// Remote workout service
    Http,
}

/// Workout storage backend configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    #[serde(default = "default_backend_url")]
    pub url: String,

    #[serde(default = "default_user_id")]
    pub user_id: String,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            url: default_backend_url(),
            user_id: default_user_id(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("liftlog")
}

fn default_rest_seconds() -> i64 {
    120
}

fn default_weight_increment() -> f64 {
    2.5
}

fn default_max_weight() -> f64 {
    150.0
}

fn default_max_reps() -> u32 {
    30
}

fn default_weight() -> f64 {
    20.0
}

fn default_reps() -> u32 {
    10
}

fn default_backend_url() -> String {
    "http://localhost:8002".into()
}

fn default_user_id() -> String {
    "1".into()
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.session.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("liftlog").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.rest_seconds, 120);
        assert_eq!(config.session.weight_increment, 2.5);
        assert_eq!(config.backend.kind, BackendKind::Local);
        assert!(config.session.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.session.rest_seconds = 90;
        config.backend.kind = BackendKind::Http;
        config.save_to(&path).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.session, config.session);
        assert_eq!(parsed.backend.kind, BackendKind::Http);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[session]
rest_seconds = 90

[backend]
kind = "http"
url = "http://10.0.0.2:8002"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.rest_seconds, 90);
        assert_eq!(config.session.max_reps, 30); // default
        assert_eq!(config.backend.kind, BackendKind::Http);
        assert_eq!(config.backend.user_id, "1");
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut session = SessionConfig::default();
        session.weight_increment = 0.0;
        assert!(session.validate().is_err());

        let mut session = SessionConfig::default();
        session.default_reps = 50;
        assert!(session.validate().is_err());

        let mut session = SessionConfig::default();
        session.rest_seconds = 0;
        assert!(session.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_rest_seconds() {
        let mut session = SessionConfig::default();
        session.rest_seconds = MAX_REST_SECONDS;
        assert!(session.validate().is_ok());

        session.rest_seconds = MAX_REST_SECONDS + 1;
        assert!(matches!(session.validate(), Err(Error::Config(_))));

        // Would overflow chrono::Duration::seconds if accepted
        session.rest_seconds = i64::MAX;
        assert!(matches!(session.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_rejects_huge_rest() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nrest_seconds = 9223372036854775807\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_rejects_invalid_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nmax_reps = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
