//! In-memory implementation of the emulator filesystem.
//!
//! Behaves like the emulator runtime's default in-memory filesystem: a
//! directory must exist before files or subdirectories are created in it,
//! and errors carry the same errno-style kinds.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use gbaweb_core::emulator::fs::{FsError, FsResult, VirtualFs};

#[derive(Debug, Default)]
struct Tree {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
}

#[derive(Debug)]
pub struct MemoryVirtualFs {
    tree: Mutex<Tree>,
    mkdir_tree: bool,
}

impl Default for MemoryVirtualFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVirtualFs {
    /// Creates an empty filesystem containing only `/`, with `mkdir_tree` support.
    pub fn new() -> Self {
        let mut tree = Tree::default();
        tree.dirs.insert("/".to_string());
        Self {
            tree: Mutex::new(tree),
            mkdir_tree: true,
        }
    }

    /// Creates a filesystem that only supports single-level `mkdir`.
    pub fn without_mkdir_tree() -> Self {
        Self {
            mkdir_tree: false,
            ..Self::new()
        }
    }

    pub fn is_dir(&self, path: &str) -> bool {
        normalize(path).is_ok_and(|path| self.lock().dirs.contains(&path))
    }

    /// Paths of every regular file, sorted.
    pub fn files(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VirtualFs for MemoryVirtualFs {
    fn mkdir(&self, path: &str) -> FsResult<()> {
        let path = normalize(path)?;
        let mut tree = self.lock();
        if tree.dirs.contains(&path) || tree.files.contains_key(&path) {
            return Err(FsError::AlreadyExists);
        }
        if !tree.dirs.contains(parent(&path)) {
            return Err(FsError::NotFound);
        }
        tree.dirs.insert(path);
        Ok(())
    }

    fn mkdir_tree(&self, path: &str) -> FsResult<()> {
        if !self.mkdir_tree {
            return Err(FsError::Unsupported);
        }
        let path = normalize(path)?;
        let mut tree = self.lock();
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            if tree.files.contains_key(&current) {
                return Err(FsError::Other(format!("{current} is not a directory")));
            }
            tree.dirs.insert(current.clone());
        }
        Ok(())
    }

    fn write_file(&self, path: &str, bytes: &[u8]) -> FsResult<()> {
        let path = normalize(path)?;
        let mut tree = self.lock();
        if tree.dirs.contains(&path) {
            return Err(FsError::Other(format!("{path} is a directory")));
        }
        if !tree.dirs.contains(parent(&path)) {
            return Err(FsError::NotFound);
        }
        tree.files.insert(path, bytes.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let path = normalize(path)?;
        self.lock().files.get(&path).cloned().ok_or(FsError::NotFound)
    }

    fn unlink(&self, path: &str) -> FsResult<()> {
        let path = normalize(path)?;
        let mut tree = self.lock();
        if tree.dirs.contains(&path) {
            return Err(FsError::Other(format!("{path} is a directory")));
        }
        tree.files.remove(&path).map(|_| ()).ok_or(FsError::NotFound)
    }

    fn exists(&self, path: &str) -> bool {
        let Ok(path) = normalize(path) else {
            return false;
        };
        let tree = self.lock();
        tree.dirs.contains(&path) || tree.files.contains_key(&path)
    }
}

fn normalize(path: &str) -> FsResult<String> {
    if !path.starts_with('/') {
        return Err(FsError::Other(format!("path must be absolute: {path}")));
    }
    let trimmed = path.trim_end_matches('/');
    Ok(if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() })
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mkdir_requires_parent_and_reports_existing() {
        let fs = MemoryVirtualFs::new();
        assert_eq!(fs.mkdir("/a/b"), Err(FsError::NotFound));
        fs.mkdir("/a").unwrap();
        fs.mkdir("/a/b").unwrap();
        assert_eq!(fs.mkdir("/a"), Err(FsError::AlreadyExists));
        assert!(fs.is_dir("/a/b/"));
    }

    #[test]
    fn test_mkdir_tree_support_is_optional() {
        let fs = MemoryVirtualFs::new();
        fs.mkdir_tree("/x/y/z").unwrap();
        assert!(fs.is_dir("/x/y"));

        let plain = MemoryVirtualFs::without_mkdir_tree();
        assert_eq!(plain.mkdir_tree("/x"), Err(FsError::Unsupported));
    }

    #[test]
    fn test_file_lifecycle() {
        let fs = MemoryVirtualFs::new();
        assert_eq!(fs.write_file("/saves/a.sav", b"x"), Err(FsError::NotFound));

        fs.mkdir("/saves").unwrap();
        fs.write_file("/saves/a.sav", b"first").unwrap();
        fs.write_file("/saves/a.sav", b"second").unwrap();
        assert_eq!(fs.read_file("/saves/a.sav").unwrap(), b"second");
        assert!(fs.exists("/saves/a.sav"));

        fs.unlink("/saves/a.sav").unwrap();
        assert_eq!(fs.unlink("/saves/a.sav"), Err(FsError::NotFound));
        assert_eq!(fs.read_file("/saves/a.sav"), Err(FsError::NotFound));
    }

    #[test]
    fn test_relative_paths_are_rejected() {
        let fs = MemoryVirtualFs::new();
        assert!(matches!(fs.mkdir("roms"), Err(FsError::Other(_))));
        assert!(!fs.exists("roms"));
    }
}
