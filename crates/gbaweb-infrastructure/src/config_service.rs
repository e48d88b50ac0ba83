//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the root configuration
//! from the configuration file (~/.config/gbaweb/config.toml).

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use gbaweb_core::config::GbaConfig;
use gbaweb_core::error::{GbaError, Result};

use crate::paths::GbaPaths;
use crate::storage::AtomicFile;

/// Configuration service that loads and caches the root configuration.
///
/// This implementation reads the configuration from config.toml
/// and caches it to avoid repeated file I/O operations.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<GbaConfig>>>,
}

impl ConfigService {
    /// Creates a ConfigService reading the default config file.
    pub fn new() -> Result<Self> {
        let path = GbaPaths::new(None).config_file()?;
        Ok(Self::with_path(path))
    }

    /// Creates a ConfigService reading `path`.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the root configuration, loading from file if not cached.
    ///
    /// A missing file yields the defaults; an unreadable or invalid file is
    /// an error.
    pub fn get_config(&self) -> Result<GbaConfig> {
        // Check if already cached
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load_config()?;

        // Cache it
        {
            let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    /// Validates and atomically writes `config`, then refreshes the cache.
    pub fn save_config(&self, config: &GbaConfig) -> Result<()> {
        config.validate()?;
        let content = toml::to_string_pretty(config)?;
        AtomicFile::new(self.path.clone())
            .save(content.as_bytes())
            .map_err(|e| GbaError::config(format!("Failed to write {:?}: {}", self.path, e)))?;

        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(config.clone());
        Ok(())
    }

    fn load_config(&self) -> Result<GbaConfig> {
        let file = AtomicFile::new(self.path.clone());
        let Some(bytes) = file
            .load()
            .map_err(|e| GbaError::config(format!("Failed to read {:?}: {}", self.path, e)))?
        else {
            tracing::debug!("[Config] No config at {:?}, using defaults", self.path);
            return Ok(GbaConfig::default());
        };

        let content = String::from_utf8(bytes)
            .map_err(|e| GbaError::config(format!("{:?} is not UTF-8: {}", self.path, e)))?;
        let config: GbaConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp.path().join("config.toml"));
        assert_eq!(service.get_config().unwrap(), GbaConfig::default());
    }

    #[test]
    fn test_reads_and_caches_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "autosave_interval_secs = 5\nreuse_module = true\n").unwrap();

        let service = ConfigService::with_path(path.clone());
        let config = service.get_config().unwrap();
        assert_eq!(config.autosave_interval_secs, 5);
        assert!(config.reuse_module);

        // Cached until invalidated
        std::fs::write(&path, "autosave_interval_secs = 60\n").unwrap();
        assert_eq!(service.get_config().unwrap().autosave_interval_secs, 5);
        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().autosave_interval_secs, 60);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "autosave_interval_secs = 0\n").unwrap();

        let service = ConfigService::with_path(path);
        assert!(matches!(service.get_config(), Err(GbaError::Config(_))));
    }

    #[test]
    fn test_save_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let service = ConfigService::with_path(path.clone());

        let config = GbaConfig {
            autosave_interval_secs: 30,
            ..Default::default()
        };
        service.save_config(&config).unwrap();

        let fresh = ConfigService::with_path(path);
        assert_eq!(fresh.get_config().unwrap(), config);
    }
}
