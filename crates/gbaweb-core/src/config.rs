use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::emulator::layout::{DEFAULT_ROM_DIRECTORY, DEFAULT_SAVE_DIRECTORY, FsLayout};
use crate::error::{GbaError, Result};

pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 15;

/// Root configuration, read from `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GbaConfig {
    /// Seconds between autosave ticks.
    pub autosave_interval_secs: u64,
    /// ROM directory inside the emulator filesystem.
    pub rom_directory: String,
    /// Save directory inside the emulator filesystem.
    pub save_directory: String,
    /// Keep the loaded module across boots instead of instantiating a new one.
    pub reuse_module: bool,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Overrides the platform data directory as the store root.
    pub base_dir: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// When set, logs are also written to a daily rolling file here.
    pub directory: Option<PathBuf>,
}

impl Default for GbaConfig {
    fn default() -> Self {
        Self {
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
            rom_directory: DEFAULT_ROM_DIRECTORY.to_string(),
            save_directory: DEFAULT_SAVE_DIRECTORY.to_string(),
            reuse_module: false,
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GbaConfig {
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    pub fn layout(&self) -> FsLayout {
        FsLayout::new(self.rom_directory.clone(), self.save_directory.clone())
    }

    /// Rejects values the controller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.autosave_interval_secs == 0 {
            return Err(GbaError::config("autosave_interval_secs must be positive"));
        }
        for (key, dir) in [
            ("rom_directory", &self.rom_directory),
            ("save_directory", &self.save_directory),
        ] {
            if !dir.starts_with('/') {
                return Err(GbaError::config(format!(
                    "{key} must be an absolute path, got '{dir}'"
                )));
            }
        }
        if self.rom_directory == self.save_directory {
            return Err(GbaError::config(
                "rom_directory and save_directory must differ",
            ));
        }
        Ok(())
    }
}
