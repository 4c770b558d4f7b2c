//! File locations and processing settings, loaded from TOML.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    TomlParse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings for the rebuild and query commands. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct N225Config {
    pub baseline_path: PathBuf,
    pub event_log_path: PathBuf,
    pub documents_dir: PathBuf,
    /// Documents published before this date are not processed.
    pub cutover_date: NaiveDate,
    pub constituent_count: usize,
}

impl Default for N225Config {
    fn default() -> Self {
        Self {
            baseline_path: PathBuf::from("data/initial_n225.csv"),
            event_log_path: PathBuf::from("data/n225.csv"),
            documents_dir: PathBuf::from("documents"),
            cutover_date: NaiveDate::from_ymd_opt(2020, 4, 1).unwrap_or_default(),
            constituent_count: 225,
        }
    }
}

impl N225Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if given and present, else fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                tracing::debug!("Config {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.constituent_count == 0 {
            return Err(ConfigError::Invalid(
                "constituent_count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = N225Config::default();
        assert_eq!(config.baseline_path, PathBuf::from("data/initial_n225.csv"));
        assert_eq!(config.event_log_path, PathBuf::from("data/n225.csv"));
        assert_eq!(config.cutover_date, NaiveDate::from_ymd_opt(2020, 4, 1).unwrap());
        assert_eq!(config.constituent_count, 225);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = N225Config::from_toml_str(
            r#"
            event_log_path = "out/events.csv"
            cutover_date = "2021-01-01"
            "#,
        )
        .unwrap();
        assert_eq!(config.event_log_path, PathBuf::from("out/events.csv"));
        assert_eq!(config.cutover_date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(config.documents_dir, PathBuf::from("documents"));
    }

    #[test]
    fn test_rejects_zero_count() {
        assert!(matches!(
            N225Config::from_toml_str("constituent_count = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_bad_toml() {
        assert!(matches!(
            N225Config::from_toml_str("cutover_date = \"not a date\""),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = N225Config::load_or_default(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, N225Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("n225.toml");
        std::fs::write(&path, "documents_dir = \"pdf_json\"\n").unwrap();
        let config = N225Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.documents_dir, PathBuf::from("pdf_json"));
    }
}
