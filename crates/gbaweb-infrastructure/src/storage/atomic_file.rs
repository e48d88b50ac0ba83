//! Atomic file operations with ACID guarantees.
//!
//! Provides a thin layer for safe concurrent access to single-record files
//! (save blobs, the store manifest, config.toml).

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write as IoWrite};
use std::path::{Path, PathBuf};

use gbaweb_core::error::GbaError;

/// Errors that can occur during atomic file operations.
#[derive(Debug)]
pub enum AtomicFileError {
    /// File I/O error.
    IoError(std::io::Error),
    /// File locking error.
    LockError(String),
}

impl std::fmt::Display for AtomicFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomicFileError::IoError(e) => write!(f, "I/O error: {}", e),
            AtomicFileError::LockError(e) => write!(f, "Lock error: {}", e),
        }
    }
}

impl std::error::Error for AtomicFileError {}

impl From<std::io::Error> for AtomicFileError {
    fn from(e: std::io::Error) -> Self {
        AtomicFileError::IoError(e)
    }
}

/// Every storage-medium failure is reported to callers as an unavailable store.
impl From<AtomicFileError> for GbaError {
    fn from(e: AtomicFileError) -> Self {
        GbaError::store_unavailable(e.to_string())
    }
}

/// A handle to a file that is only ever replaced as a whole.
///
/// Provides:
/// - **Atomicity**: Updates are all-or-nothing via tmp file + atomic rename
/// - **Isolation**: File locking prevents concurrent writers across processes
/// - **Durability**: Explicit fsync before rename
pub struct AtomicFile {
    path: PathBuf,
}

impl AtomicFile {
    /// Creates a new atomic file handle.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file contents.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))`: Successfully loaded
    /// - `Ok(None)`: File doesn't exist
    /// - `Err`: Failed to read the file
    pub fn load(&self) -> Result<Option<Vec<u8>>, AtomicFileError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the file contents atomically.
    ///
    /// Uses a temporary file + atomic rename while holding the file lock, so
    /// readers observe either the previous or the new contents.
    pub fn save(&self, data: &[u8]) -> Result<(), AtomicFileError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let _lock = self.acquire_lock()?;

        // Write to temporary file in the same directory
        let tmp_path = self.get_temp_path()?;
        let result = Self::write_and_sync(&tmp_path, data)
            .and_then(|()| fs::rename(&tmp_path, &self.path).map_err(AtomicFileError::from));

        if result.is_err() {
            // Never leave a half-written temp file behind
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    /// Removes the file. Removing a missing file succeeds.
    pub fn remove(&self) -> Result<(), AtomicFileError> {
        let _lock = self.acquire_lock()?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_and_sync(tmp_path: &Path, data: &[u8]) -> Result<(), AtomicFileError> {
        let mut tmp_file = File::create(tmp_path)?;
        tmp_file.write_all(data)?;
        // Ensure data is written to disk
        tmp_file.sync_all()?;
        Ok(())
    }

    /// Gets a temporary file path for atomic writes.
    fn get_temp_path(&self) -> Result<PathBuf, AtomicFileError> {
        let parent = self.path.parent().ok_or_else(|| {
            AtomicFileError::IoError(std::io::Error::new(
                ErrorKind::InvalidInput,
                "Path has no parent directory",
            ))
        })?;

        let file_name = self.path.file_name().ok_or_else(|| {
            AtomicFileError::IoError(std::io::Error::new(
                ErrorKind::InvalidInput,
                "Path has no file name",
            ))
        })?;

        let tmp_name = format!(".{}.tmp", file_name.to_string_lossy());
        Ok(parent.join(tmp_name))
    }

    /// Acquires an exclusive file lock.
    ///
    /// Returns a lock guard that automatically releases the lock when dropped.
    fn acquire_lock(&self) -> Result<FileLock, AtomicFileError> {
        FileLock::acquire(&self.path)
    }
}

/// A file lock guard that releases the lock when dropped.
///
/// The lock file itself is never deleted. Unlinking it would let a waiter
/// keep a lock on the orphaned inode while a newcomer locks a fresh file.
struct FileLock {
    #[allow(dead_code)]
    file: File,
}

impl FileLock {
    /// Acquires an exclusive lock on the given path.
    fn acquire(path: &Path) -> Result<Self, AtomicFileError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lock_path = path.with_file_name(format!(".{file_name}.lock"));

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| AtomicFileError::LockError(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock { file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::new(temp_dir.path().join("game.sav"));

        file.save(&[1, 2, 3, 4]).unwrap();

        assert_eq!(file.load().unwrap(), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::new(temp_dir.path().join("nonexistent.sav"));

        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_whole_contents() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::new(temp_dir.path().join("game.sav"));

        file.save(&[0xAA; 128]).unwrap();
        file.save(&[0x55; 16]).unwrap();

        assert_eq!(file.load().unwrap(), Some(vec![0x55; 16]));
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("game.sav");
        let file = AtomicFile::new(path.clone());

        file.save(b"battery").unwrap();

        assert!(!temp_dir.path().join(".game.sav.tmp").exists());
        assert!(path.exists());
    }

    #[test]
    fn test_lock_file_is_kept_between_writers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("game.sav");
        let lock_path = temp_dir.path().join(".game.sav.lock");
        let file = AtomicFile::new(path.clone());

        file.save(b"first").unwrap();
        assert!(lock_path.exists());

        let before = std::fs::metadata(&lock_path).unwrap();
        AtomicFile::new(path.clone()).save(b"second").unwrap();
        file.remove().unwrap();
        let after = std::fs::metadata(&lock_path).unwrap();

        // Every writer must lock the same inode
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            assert_eq!(before.ino(), after.ino());
        }
        #[cfg(not(unix))]
        let _ = (before, after);
        assert!(!path.exists());
    }

    #[test]
    fn test_concurrent_writers_never_interleave() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("game.sav");

        let writers: Vec<_> = (0..8u8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let file = AtomicFile::new(path);
                    for _ in 0..20 {
                        file.save(&[i; 4096]).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let contents = AtomicFile::new(path).load().unwrap().unwrap();
        assert_eq!(contents.len(), 4096);
        assert!(contents.iter().all(|b| *b == contents[0]));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicFile::new(temp_dir.path().join("game.sav"));

        file.save(b"x").unwrap();
        file.remove().unwrap();
        file.remove().unwrap();

        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_error_maps_to_store_unavailable() {
        let err: GbaError = AtomicFileError::LockError("busy".into()).into();
        assert!(err.is_store_unavailable());
    }
}
