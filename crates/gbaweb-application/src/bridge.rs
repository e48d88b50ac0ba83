//! Canonical-path access to the emulator's virtual filesystem.
//!
//! All paths are derived from the session's [`RomIdentity`] through the
//! configured [`FsLayout`], so two ROMs can never share a file.

use std::sync::Arc;

use gbaweb_core::emulator::{FsError, FsLayout, VirtualFs};
use gbaweb_core::error::{GbaError, Result};
use gbaweb_core::identity::RomIdentity;

#[derive(Clone)]
pub struct VirtualFsBridge {
    fs: Arc<dyn VirtualFs>,
    layout: FsLayout,
}

impl VirtualFsBridge {
    pub fn new(fs: Arc<dyn VirtualFs>, layout: FsLayout) -> Self {
        Self { fs, layout }
    }

    pub fn layout(&self) -> &FsLayout {
        &self.layout
    }

    /// Idempotently creates `path` and its parents.
    ///
    /// Prefers the filesystem's own `mkdir_tree`, falling back to one `mkdir`
    /// per segment. "Already exists" is never an error; other failures are
    /// logged, and an error is only returned if the directory still does not
    /// exist afterwards. Callers treat that error as non-fatal.
    pub fn ensure_directory(&self, path: &str) -> Result<()> {
        match self.fs.mkdir_tree(path) {
            Ok(()) | Err(FsError::AlreadyExists) => return Ok(()),
            Err(FsError::Unsupported) => {}
            Err(e) => {
                tracing::warn!("[VfsBridge] mkdir_tree {} failed: {}", path, e);
            }
        }

        let mut first_error: Option<FsError> = None;
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            match self.fs.mkdir(&current) {
                Ok(()) | Err(FsError::AlreadyExists) => {}
                Err(e) => {
                    tracing::warn!("[VfsBridge] Could not create directory {}: {}", current, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if self.fs.exists(path) {
            return Ok(());
        }
        Err(GbaError::DirectoryCreate {
            path: path.to_string(),
            message: first_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "directory missing after creation".to_string()),
        })
    }

    /// Writes the ROM image to its canonical path, replacing any stale copy.
    ///
    /// Returns the path written.
    pub fn write_rom(&self, identity: &RomIdentity, bytes: &[u8]) -> Result<String> {
        let path = self.layout.rom_path(identity);

        if self.fs.exists(&path) {
            // A failed removal is harmless: write_file truncates anyway
            if let Err(e) = self.fs.unlink(&path) {
                let err = GbaError::StaleFileRemoval {
                    path: path.clone(),
                    message: e.to_string(),
                };
                tracing::debug!("[VfsBridge] Ignoring {}", err);
            }
        }

        self.fs
            .write_file(&path, bytes)
            .map_err(|e| GbaError::filesystem(&path, e.to_string()))?;
        tracing::debug!("[VfsBridge] Wrote {} ROM bytes to {}", bytes.len(), path);
        Ok(path)
    }

    /// Places a previously stored save where the core will look for it.
    ///
    /// Must run before the core starts. `None` skips the write entirely.
    /// Returns true if a save was written.
    pub fn seed_save(&self, identity: &RomIdentity, save: Option<&[u8]>) -> Result<bool> {
        let Some(bytes) = save else {
            return Ok(false);
        };
        let path = self.layout.save_path(identity);
        self.fs
            .write_file(&path, bytes)
            .map_err(|e| GbaError::filesystem(&path, e.to_string()))?;
        tracing::debug!("[VfsBridge] Seeded {} save bytes at {}", bytes.len(), path);
        Ok(true)
    }

    /// Reads the core's current save file.
    ///
    /// Returns `Ok(None)` when the game has not written battery storage yet.
    pub fn read_save(&self, identity: &RomIdentity) -> Result<Option<Vec<u8>>> {
        let path = self.layout.save_path(identity);
        match self.fs.read_file(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(FsError::NotFound) => Ok(None),
            Err(e) => Err(GbaError::filesystem(path, e.to_string())),
        }
    }
}
