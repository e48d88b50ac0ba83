//! In-memory SaveRepository implementation.
//!
//! Used for ephemeral sessions where nothing may touch the host disk, and as
//! the store double in controller tests.

use std::collections::HashMap;

use async_trait::async_trait;
use gbaweb_core::error::Result;
use gbaweb_core::identity::RomIdentity;
use gbaweb_core::save::SaveRepository;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemorySaveRepository {
    records: RwLock<HashMap<RomIdentity, Vec<u8>>>,
}

impl MemorySaveRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SaveRepository for MemorySaveRepository {
    async fn put(&self, identity: &RomIdentity, bytes: &[u8]) -> Result<()> {
        self.records
            .write()
            .await
            .insert(identity.clone(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, identity: &RomIdentity) -> Result<Option<Vec<u8>>> {
        Ok(self.records.read().await.get(identity).cloned())
    }

    async fn delete(&self, identity: &RomIdentity) -> Result<()> {
        self.records.write().await.remove(identity);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<RomIdentity>> {
        Ok(self.records.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbaweb_core::identity::digest;

    #[tokio::test]
    async fn test_memory_store_contract() {
        let repo = MemorySaveRepository::new();
        let id = digest(b"rom");

        assert_eq!(repo.get(&id).await.unwrap(), None);
        repo.put(&id, b"save").await.unwrap();
        assert_eq!(repo.get(&id).await.unwrap(), Some(b"save".to_vec()));
        assert_eq!(repo.list_keys().await.unwrap(), vec![id.clone()]);

        repo.delete(&id).await.unwrap();
        repo.delete(&id).await.unwrap();
        assert!(repo.is_empty().await);
    }
}
