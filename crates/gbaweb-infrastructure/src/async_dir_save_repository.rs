//! Directory-backed SaveRepository implementation.

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use gbaweb_core::emulator::layout::SAVE_EXTENSION;
use gbaweb_core::error::{GbaError, Result};
use gbaweb_core::identity::RomIdentity;
use gbaweb_core::save::SaveRepository;

use crate::paths::{GbaPaths, PathError};
use crate::storage::{AtomicFile, StoreManifest};

/// Directory-backed save repository.
///
/// Directory structure:
/// ```text
/// base_dir/
/// └── saves/
///     ├── store.json
///     ├── <identity-1>.sav
///     └── <identity-2>.sav
/// ```
///
/// `put` and `delete` draw a ticket when they are called, before the
/// returned future is first polled. Mutations of one key run one at a time,
/// and a mutation whose ticket is older than the last committed one for the
/// key is dropped. The committed value therefore belongs to the latest call,
/// whatever order the futures are awaited in.
pub struct AsyncDirSaveRepository {
    dir: PathBuf,
    next_ticket: AtomicU64,
    /// Only keys with a mutation in flight have an entry.
    keys: Mutex<HashMap<RomIdentity, Arc<KeySlot>>>,
}

#[derive(Default)]
struct KeySlot {
    /// Ticket of the last committed mutation.
    committed: tokio::sync::Mutex<u64>,
}

/// A mutation that holds its ticket but has not run yet.
struct PendingWrite {
    ticket: u64,
    slot: Arc<KeySlot>,
}

fn store_path_error(e: PathError) -> GbaError {
    GbaError::store_unavailable(format!("Cannot resolve save directory: {}", e))
}

impl AsyncDirSaveRepository {
    /// Creates an AsyncDirSaveRepository instance at the default location.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the namespace cannot be located or opened.
    pub async fn default() -> Result<Self> {
        Self::new(None).await
    }

    /// Creates a new AsyncDirSaveRepository with custom base directory.
    pub async fn new(base_dir: Option<&Path>) -> Result<Self> {
        let dir = GbaPaths::new(base_dir)
            .saves_dir()
            .map_err(store_path_error)?;
        Self::open(dir).await
    }

    /// Opens the namespace rooted directly at `dir`.
    pub async fn open(dir: PathBuf) -> Result<Self> {
        let manifest_dir = dir.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            std::fs::create_dir_all(&manifest_dir).map_err(|e| {
                GbaError::store_unavailable(format!(
                    "Failed to create save directory {:?}: {}",
                    manifest_dir, e
                ))
            })?;
            StoreManifest::load_or_init(&manifest_dir)?;
            Ok(())
        })
        .await
        .map_err(|e| GbaError::internal(format!("Failed to join task: {}", e)))??;

        tracing::debug!("[SaveStore] Opened save store at {:?}", dir);

        Ok(Self {
            dir,
            next_ticket: AtomicU64::new(1),
            keys: Mutex::new(HashMap::new()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, identity: &RomIdentity) -> PathBuf {
        self.dir.join(format!("{identity}.{SAVE_EXTENSION}"))
    }

    /// Draws a ticket and pins the key's slot. Runs at call time.
    fn begin(&self, identity: &RomIdentity) -> PendingWrite {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        let slot = keys.entry(identity.clone()).or_default().clone();
        PendingWrite { ticket, slot }
    }

    /// Unpins the key's slot and forgets it once nothing else holds it.
    fn release(&self, identity: &RomIdentity, pending: PendingWrite) {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        drop(pending);
        if keys
            .get(identity)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            keys.remove(identity);
        }
    }

    /// Runs a blocking file mutation for `identity` in ticket order.
    async fn mutate<F>(
        &self,
        identity: &RomIdentity,
        pending: PendingWrite,
        op: &'static str,
        f: F,
    ) -> Result<bool>
    where
        F: FnOnce(AtomicFile) -> Result<()> + Send + 'static,
    {
        let result = self.commit(identity, &pending, op, f).await;
        self.release(identity, pending);
        result
    }

    async fn commit<F>(
        &self,
        identity: &RomIdentity,
        pending: &PendingWrite,
        op: &'static str,
        f: F,
    ) -> Result<bool>
    where
        F: FnOnce(AtomicFile) -> Result<()> + Send + 'static,
    {
        let mut committed = pending.slot.committed.lock().await;

        if *committed > pending.ticket {
            tracing::debug!(
                "[SaveStore] Dropping superseded {} for {} (ticket {} < {})",
                op,
                identity,
                pending.ticket,
                *committed
            );
            return Ok(false);
        }

        let file = AtomicFile::new(self.record_path(identity));
        tokio::task::spawn_blocking(move || f(file))
            .await
            .map_err(|e| GbaError::internal(format!("Failed to join task: {}", e)))??;

        *committed = pending.ticket;
        Ok(true)
    }
}

type StoreFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

// put and delete are written out in desugared form so the ticket is drawn
// before the future is returned.
#[async_trait]
impl SaveRepository for AsyncDirSaveRepository {
    fn put<'life0, 'life1, 'life2, 'async_trait>(
        &'life0 self,
        identity: &'life1 RomIdentity,
        bytes: &'life2 [u8],
    ) -> StoreFuture<'async_trait>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        'life2: 'async_trait,
        Self: 'async_trait,
    {
        let pending = self.begin(identity);
        let data = bytes.to_vec();
        Box::pin(async move {
            let len = data.len();
            let written = self
                .mutate(identity, pending, "put", move |file| {
                    file.save(&data).map_err(|e| {
                        GbaError::store_unavailable(format!("Failed to write save record: {}", e))
                    })
                })
                .await?;
            if written {
                tracing::debug!("[SaveStore] Committed {} bytes for {}", len, identity);
            }
            Ok(())
        })
    }

    async fn get(&self, identity: &RomIdentity) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.record_path(identity)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GbaError::store_unavailable(format!(
                "Failed to read save record {}: {}",
                identity, e
            ))),
        }
    }

    fn delete<'life0, 'life1, 'async_trait>(
        &'life0 self,
        identity: &'life1 RomIdentity,
    ) -> StoreFuture<'async_trait>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let pending = self.begin(identity);
        Box::pin(async move {
            self.mutate(identity, pending, "delete", |file| {
                file.remove().map_err(|e| {
                    GbaError::store_unavailable(format!("Failed to delete save record: {}", e))
                })
            })
            .await?;
            Ok(())
        })
    }

    async fn list_keys(&self) -> Result<Vec<RomIdentity>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            GbaError::store_unavailable(format!("Failed to list save store: {}", e))
        })?;

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            GbaError::store_unavailable(format!("Failed to list save store: {}", e))
        })? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SAVE_EXTENSION) {
                continue;
            }
            // Temp and lock files start with '.', so they never parse
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match stem.parse::<RomIdentity>() {
                Ok(identity) => keys.push(identity),
                Err(_) => tracing::debug!("[SaveStore] Skipping foreign file {:?}", path),
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbaweb_core::identity::digest;
    use tempfile::TempDir;

    async fn create_test_repository() -> (AsyncDirSaveRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let repo = AsyncDirSaveRepository::new(Some(temp_dir.path()))
            .await
            .unwrap();
        (repo, temp_dir)
    }

    #[tokio::test]
    async fn test_put_and_get_round_trip() {
        let (repo, _temp) = create_test_repository().await;
        let id = digest(b"rom one");
        let save: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();

        repo.put(&id, &save).await.unwrap();

        assert_eq!(repo.get(&id).await.unwrap(), Some(save));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (repo, _temp) = create_test_repository().await;
        assert_eq!(repo.get(&digest(b"unknown")).await.unwrap(), None);
        assert!(!repo.contains(&digest(b"unknown")).await.unwrap());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let (repo, _temp) = create_test_repository().await;
        let id = digest(b"rom");

        repo.put(&id, b"first").await.unwrap();
        repo.put(&id, b"second").await.unwrap();

        assert_eq!(repo.get(&id).await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (repo, _temp) = create_test_repository().await;
        let id = digest(b"rom");

        repo.put(&id, b"save").await.unwrap();
        repo.delete(&id).await.unwrap();
        repo.delete(&id).await.unwrap();

        assert_eq!(repo.get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_keys_only_reports_identities() {
        let (repo, temp) = create_test_repository().await;
        let a = digest(b"rom a");
        let b = digest(b"rom b");
        repo.put(&a, b"a").await.unwrap();
        repo.put(&b, b"b").await.unwrap();
        std::fs::write(temp.path().join("saves").join("notes.sav"), b"junk").unwrap();

        let mut keys = repo.list_keys().await.unwrap();
        keys.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let id = digest(b"rom");
        {
            let repo = AsyncDirSaveRepository::new(Some(temp.path())).await.unwrap();
            repo.put(&id, b"persisted").await.unwrap();
        }
        let reopened = AsyncDirSaveRepository::new(Some(temp.path())).await.unwrap();
        assert_eq!(reopened.get(&id).await.unwrap(), Some(b"persisted".to_vec()));
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let (repo, _temp) = create_test_repository().await;
        let a = digest(b"rom a");
        let b = digest(b"rom b");

        repo.put(&a, b"save a").await.unwrap();
        repo.put(&b, b"save b").await.unwrap();
        repo.delete(&b).await.unwrap();

        assert_eq!(repo.get(&a).await.unwrap(), Some(b"save a".to_vec()));
    }

    #[tokio::test]
    async fn test_same_key_writes_commit_in_call_order() {
        let (repo, _temp) = create_test_repository().await;
        let id = digest(b"rom");

        // join! polls each branch once in order before any of them finishes
        let (a, b, c, d) = tokio::join!(
            repo.put(&id, b"one"),
            repo.put(&id, b"two"),
            repo.put(&id, b"three"),
            repo.put(&id, b"four"),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();
        d.unwrap();

        assert_eq!(repo.get(&id).await.unwrap(), Some(b"four".to_vec()));
    }

    #[tokio::test]
    async fn test_later_call_wins_when_awaited_first() {
        let (repo, _temp) = create_test_repository().await;
        let id = digest(b"rom");

        let first = repo.put(&id, b"called first");
        let second = repo.put(&id, b"called second");
        second.await.unwrap();
        first.await.unwrap();

        assert_eq!(repo.get(&id).await.unwrap(), Some(b"called second".to_vec()));
    }

    #[tokio::test]
    async fn test_earlier_delete_does_not_erase_later_put() {
        let (repo, _temp) = create_test_repository().await;
        let id = digest(b"rom");
        repo.put(&id, b"old").await.unwrap();

        let delete = repo.delete(&id);
        let put = repo.put(&id, b"new");
        put.await.unwrap();
        delete.await.unwrap();

        assert_eq!(repo.get(&id).await.unwrap(), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_idle_keys_are_forgotten() {
        let (repo, _temp) = create_test_repository().await;
        let ids: Vec<RomIdentity> = (0..32u8).map(|i| digest(&[i])).collect();

        for id in &ids {
            repo.put(id, b"save").await.unwrap();
        }
        repo.delete(&ids[0]).await.unwrap();
        let first = repo.put(&ids[1], b"a");
        let second = repo.put(&ids[1], b"b");
        second.await.unwrap();
        assert_eq!(repo.keys.lock().unwrap().len(), 1);
        first.await.unwrap();

        assert!(repo.keys.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unresolvable_location_is_store_unavailable() {
        assert!(store_path_error(PathError::HomeDirNotFound).is_store_unavailable());
    }

    #[tokio::test]
    async fn test_writes_to_different_keys_do_not_interfere() {
        let (repo, _temp) = create_test_repository().await;
        let a = digest(b"rom a");
        let b = digest(b"rom b");

        let (ra, rb) = tokio::join!(repo.put(&a, b"save a"), repo.put(&b, b"save b"));
        ra.unwrap();
        rb.unwrap();

        assert_eq!(repo.get(&a).await.unwrap(), Some(b"save a".to_vec()));
        assert_eq!(repo.get(&b).await.unwrap(), Some(b"save b".to_vec()));
    }

    #[tokio::test]
    async fn test_unwritable_directory_surfaces_store_unavailable() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocked");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let err = match AsyncDirSaveRepository::open(blocker.join("saves")).await {
            Err(err) => err,
            Ok(_) => panic!("opening below a regular file must fail"),
        };
        assert!(err.is_store_unavailable());
    }
}
