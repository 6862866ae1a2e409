//! Application path management.
//!
//! - **Dev mode**: if `config.yaml` exists in the working directory, it is
//!   used directly and logs go to `./logs`.
//! - **Installed mode** (default): the config lives in the platform config
//!   directory and logs in the platform data directory, both under
//!   `spin-tally/`.

use std::path::PathBuf;
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "spin-tally";

/// Application paths for config and logs.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Path to the logs directory
    pub logs_dir: PathBuf,
}

impl AppPaths {
    /// Detect the appropriate paths based on environment.
    ///
    /// Note: This is called before logging is initialized.
    pub fn detect() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let cwd_config = cwd.join("config.yaml");
        if cwd_config.exists() {
            return Self {
                config: cwd_config,
                logs_dir: cwd.join("logs"),
            };
        }

        let config_dir = dirs::config_dir().unwrap_or_else(|| cwd.clone()).join(APP_NAME);
        let data_dir = dirs::data_dir().unwrap_or_else(|| cwd.clone()).join(APP_NAME);

        Self {
            config: config_dir.join("config.yaml"),
            logs_dir: data_dir.join("logs"),
        }
    }

    /// Create the logs directory if needed
    pub fn ensure_logs_dir(&self) -> anyhow::Result<()> {
        if !self.logs_dir.exists() {
            debug!("Creating logs directory: {}", self.logs_dir.display());
            std::fs::create_dir_all(&self.logs_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_names_config_file() {
        let paths = AppPaths::detect();
        assert_eq!(paths.config.file_name().unwrap(), "config.yaml");
        assert!(paths.logs_dir.ends_with("logs"));
    }

    #[test]
    fn test_ensure_logs_dir() {
        let dir = TempDir::new().unwrap();
        let paths = AppPaths {
            config: dir.path().join("config.yaml"),
            logs_dir: dir.path().join("nested").join("logs"),
        };

        paths.ensure_logs_dir().unwrap();
        assert!(paths.logs_dir.is_dir());
    }
}
