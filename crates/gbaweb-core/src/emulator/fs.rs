//! The emulator's path-addressable byte store.

use thiserror::Error;

/// Errors raised by a [`VirtualFs`], modelled on the errno codes the
/// emulator runtime reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    /// `EEXIST`
    #[error("file exists")]
    AlreadyExists,
    /// `ENOENT`
    #[error("no such file or directory")]
    NotFound,
    /// The filesystem does not implement the operation.
    #[error("operation not supported")]
    Unsupported,
    #[error("{0}")]
    Other(String),
}

pub type FsResult<T> = std::result::Result<T, FsError>;

/// Filesystem exported by an emulator module.
///
/// Paths are absolute and `/`-separated. The running core reads its ROM and
/// reads/writes its battery save through the same filesystem, so every
/// operation is synchronous and visible to the core immediately.
pub trait VirtualFs: Send + Sync {
    /// Creates a single directory. The parent must exist.
    fn mkdir(&self, path: &str) -> FsResult<()>;

    /// Creates a directory and all missing parents.
    ///
    /// Optional; builds without it return [`FsError::Unsupported`].
    fn mkdir_tree(&self, path: &str) -> FsResult<()> {
        let _ = path;
        Err(FsError::Unsupported)
    }

    /// Creates or truncates `path` and writes `bytes` to it.
    fn write_file(&self, path: &str, bytes: &[u8]) -> FsResult<()>;

    fn read_file(&self, path: &str) -> FsResult<Vec<u8>>;

    fn unlink(&self, path: &str) -> FsResult<()>;

    fn exists(&self, path: &str) -> bool;
}
