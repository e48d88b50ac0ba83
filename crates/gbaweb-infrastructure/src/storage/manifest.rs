//! Schema manifest written at the root of an on-disk save namespace.

use std::path::Path;

use gbaweb_core::error::{GbaError, Result};
use gbaweb_core::save::{SAVES_NAMESPACE, SCHEMA_VERSION};
use serde::{Deserialize, Serialize};

use super::atomic_file::AtomicFile;

pub const MANIFEST_FILE: &str = "store.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub namespace: String,
    pub schema_version: u32,
}

impl Default for StoreManifest {
    fn default() -> Self {
        Self {
            namespace: SAVES_NAMESPACE.to_string(),
            schema_version: SCHEMA_VERSION,
        }
    }
}

impl StoreManifest {
    /// Loads the manifest in `dir`, writing the current one if none exists.
    ///
    /// Older schema versions are upgraded in place (version 1 is the first,
    /// so there is nothing to rewrite yet). A newer version or a foreign
    /// namespace makes the store unavailable to this build.
    pub fn load_or_init(dir: &Path) -> Result<Self> {
        let file = AtomicFile::new(dir.join(MANIFEST_FILE));

        let Some(bytes) = file.load()? else {
            let manifest = Self::default();
            file.save(&serde_json::to_vec_pretty(&manifest)?)?;
            tracing::info!("[SaveStore] Initialized save namespace at {:?}", dir);
            return Ok(manifest);
        };

        let manifest: Self = serde_json::from_slice(&bytes).map_err(|e| {
            GbaError::store_unavailable(format!("Corrupted store manifest: {}", e))
        })?;

        if manifest.namespace != SAVES_NAMESPACE {
            return Err(GbaError::store_unavailable(format!(
                "Directory holds namespace '{}', expected '{}'",
                manifest.namespace, SAVES_NAMESPACE
            )));
        }
        if manifest.schema_version > SCHEMA_VERSION {
            return Err(GbaError::store_unavailable(format!(
                "Store schema version {} is newer than supported version {}",
                manifest.schema_version, SCHEMA_VERSION
            )));
        }
        if manifest.schema_version < SCHEMA_VERSION {
            let upgraded = Self::default();
            file.save(&serde_json::to_vec_pretty(&upgraded)?)?;
            return Ok(upgraded);
        }

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_current_version() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = StoreManifest::load_or_init(temp_dir.path()).unwrap();
        assert_eq!(manifest.schema_version, 1);
        assert_eq!(manifest.namespace, "saves");
        assert!(temp_dir.path().join(MANIFEST_FILE).exists());

        // Second open reads the same manifest back
        assert_eq!(StoreManifest::load_or_init(temp_dir.path()).unwrap(), manifest);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(MANIFEST_FILE),
            r#"{"namespace":"saves","schema_version":2}"#,
        )
        .unwrap();

        let err = StoreManifest::load_or_init(temp_dir.path()).unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[test]
    fn test_corrupted_manifest_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(MANIFEST_FILE), "{ not json").unwrap();

        let err = StoreManifest::load_or_init(temp_dir.path()).unwrap_err();
        assert!(err.is_store_unavailable());
    }
}
