//! Configuration management for Spin Tally
//!
//! Handles loading and parsing of the YAML configuration file. Every section
//! is optional; missing fields fall back to defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use spin_tally::DEFAULT_VERIFY_TOLERANCE;
use tracing::info;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write daily log files to the logs directory
    #[serde(default)]
    pub file: bool,
    /// Emit JSON log lines
    #[serde(default)]
    pub json: bool,
}

/// Report output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_format")]
    pub format: OutputFormat,
    /// Print the closed turn stack after scoring
    #[serde(default)]
    pub show_turns: bool,
}

/// Report output format
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
}

/// Replay behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplayConfig {
    /// Cross-check incremental totals against a from-scratch rescore
    #[serde(default = "default_true")]
    pub verify: bool,
    /// Degrees of drift tolerated before a rescore counts as diverged
    #[serde(default = "default_verify_tolerance")]
    pub tolerance: f32,
    /// Fail instead of warning when the totals diverge
    #[serde(default)]
    pub strict: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
            json: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
            show_turns: false,
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            verify: default_true(),
            tolerance: default_verify_tolerance(),
            strict: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

// Default value functions
fn default_log_level() -> String { "info".to_string() }
fn default_output_format() -> OutputFormat { OutputFormat::Text }
fn default_true() -> bool { true }
fn default_verify_tolerance() -> f32 { DEFAULT_VERIFY_TOLERANCE }

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.file);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.replay.verify);
        assert_eq!(config.replay.tolerance, DEFAULT_VERIFY_TOLERANCE);
        assert!(!config.replay.strict);
    }

    #[test]
    fn test_partial_sections() {
        let yaml = "output:\n  format: json\nreplay:\n  verify: false\n  tolerance: 0.5\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.output.show_turns);
        assert!(!config.replay.verify);
        assert_eq!(config.replay.tolerance, 0.5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_or_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        let config = AppConfig::load_or_default(&path).unwrap();
        assert!(config.replay.verify);

        std::fs::write(&path, "logging:\n  level: debug\n  json: true\n").unwrap();
        let config = AppConfig::load_or_default(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_invalid_yaml_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "output: [not, a, map").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));
    }
}
