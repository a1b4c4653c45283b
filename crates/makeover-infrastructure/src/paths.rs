//! Unified path management for makeover configuration and output files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/makeover/          # Config directory
//! ├── config.toml              # Application configuration
//! └── secret.json              # API keys
//!
//! ~/.local/share/makeover/     # Data directory
//! ├── exports/                 # Downloaded results (default output)
//! └── logs/                    # Application logs
//!     └── makeover.log.YYYY-MM-DD
//! ```
//!
//! Passing a base directory roots everything under it instead, which is how
//! tests isolate themselves from the user's home.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "makeover";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolves makeover's files, optionally under an override base directory.
#[derive(Debug, Clone, Default)]
pub struct MakeoverPaths {
    base: Option<PathBuf>,
}

impl MakeoverPaths {
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    /// Returns the configuration directory (e.g. `~/.config/makeover/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("config")),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    /// Returns the data directory (e.g. `~/.local/share/makeover/`).
    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.join("data")),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// Keep this file user-readable only (600).
    pub fn secret_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("secret.json"))
    }

    pub fn exports_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("exports"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("logs"))
    }
}
