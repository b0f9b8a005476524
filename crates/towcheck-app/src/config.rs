//! Configuration management for towcheck
//!
//! Config stored at: ~/.config/towcheck/config.json

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use towcheck_domain::service::DEFAULT_COMBINATION_TOLERANCE_PERCENT;
use towcheck_types::{ConfigError, OutputFormat, Result};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding registry.json, pending.json and weigh_results.json
    #[serde(default)]
    pub store_dir: Option<PathBuf>,

    /// TOML seed imported when the registry is empty
    #[serde(default)]
    pub registry_seed: Option<PathBuf>,

    /// Default output format (json, table)
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Log filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Allowed gap between a measured and a derived whole-combination mass
    #[serde(default = "default_tolerance")]
    pub combination_tolerance_percent: f64,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_tolerance() -> f64 {
    DEFAULT_COMBINATION_TOLERANCE_PERCENT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: None,
            registry_seed: None,
            output_format: OutputFormat::default(),
            log_level: default_log_level(),
            combination_tolerance_percent: default_tolerance(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("towcheck");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Get the store directory path
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.store_dir {
            return Ok(dir.clone());
        }

        let data_dir = dirs::data_dir()
            .ok_or(ConfigError::NotFound)?
            .join("towcheck");
        Ok(data_dir)
    }

    /// Load config from file, or create default
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let tolerance = self.combination_tolerance_percent;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::ParseError(format!(
                "combination_tolerance_percent must be a non-negative number (got {})",
                tolerance
            ))
            .into());
        }
        Ok(())
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Towcheck Configuration")?;
        writeln!(f, "======================")?;
        writeln!(f)?;
        writeln!(
            f,
            "Store dir:      {}",
            self.store_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "(error)".to_string())
        )?;
        writeln!(
            f,
            "Registry seed:  {}",
            self.registry_seed
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        )?;
        writeln!(f, "Output format:  {}", self.output_format)?;
        writeln!(f, "Log level:      {}", self.log_level)?;
        writeln!(f, "Tolerance:      {}%", self.combination_tolerance_percent)?;

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:    {}", path.display())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{"output_format":"json"}"#).unwrap();
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.combination_tolerance_percent, 1.0);
        assert!(config.store_dir.is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            store_dir: Some(dir.path().join("store")),
            combination_tolerance_percent: 2.5,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
        assert_eq!(config.store_dir().unwrap(), dir.path().join("store"));
    }

    #[test]
    fn test_absent_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"combination_tolerance_percent":-1}"#).unwrap();
        assert!(Config::load_from(&path).is_err());
        let config = Config {
            combination_tolerance_percent: f64::NAN,
            ..Config::default()
        };
        assert!(config.save_to(&path).is_err());
    }
}
