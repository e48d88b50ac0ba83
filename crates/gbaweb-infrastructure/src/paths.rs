//! Unified path management for gbaweb configuration, saves and logs.
//!
//! This ensures consistency across all platforms (Linux, macOS, Windows).

use std::path::{Path, PathBuf};

use gbaweb_core::error::GbaError;

const APP_NAME: &str = "gbaweb";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform directory could not be determined.
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

impl From<PathError> for GbaError {
    fn from(e: PathError) -> Self {
        GbaError::config(e.to_string())
    }
}

/// Unified path management for gbaweb.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/gbaweb/            # Config directory
/// ├── config.toml              # Application configuration
/// └── logs/                    # Application logs
///     └── gbaweb.log.YYYY-MM-DD
///
/// ~/.local/share/gbaweb/       # Data directory
/// └── saves/                   # Save store namespace
///     ├── store.json           # Schema manifest
///     └── <identity>.sav       # One record per ROM
/// ```
///
/// A base directory override (tests, `--store`) replaces both roots.
pub struct GbaPaths {
    base_dir: Option<PathBuf>,
}

impl GbaPaths {
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            base_dir: base_dir.map(Path::to_path_buf),
        }
    }

    /// Returns the gbaweb configuration directory (e.g., `~/.config/gbaweb/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(base) = &self.base_dir {
            return Ok(base.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the gbaweb data directory (e.g., `~/.local/share/gbaweb/`).
    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(base) = &self.base_dir {
            return Ok(base.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the save store namespace directory.
    pub fn saves_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join(gbaweb_core::save::SAVES_NAMESPACE))
    }

    /// Returns the path to the logs directory.
    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("logs"))
    }
}
