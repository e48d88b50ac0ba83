//! Save repository trait.
//!
//! Defines the interface for battery-save persistence keyed by ROM identity.

use async_trait::async_trait;

use crate::error::Result;
use crate::identity::RomIdentity;

/// An abstract repository mapping [`RomIdentity`] to raw battery-save bytes.
///
/// # Implementation Notes
///
/// Implementations must:
/// - Write each record atomically (a reader sees the old or the new bytes, never a mix)
/// - Serialize writes to the same identity in call order, so a lagging write
///   never replaces a newer one
/// - Never block writes to one identity on writes to another
/// - Report an unreachable medium as `GbaError::StoreUnavailable`
#[async_trait]
pub trait SaveRepository: Send + Sync {
    /// Inserts or replaces the record for `identity`.
    ///
    /// The record is durable once the returned future resolves.
    async fn put(&self, identity: &RomIdentity, bytes: &[u8]) -> Result<()>;

    /// Returns the most recently committed bytes for `identity`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(bytes))`: Record found
    /// - `Ok(None)`: No record stored yet
    /// - `Err(_)`: The store could not be read
    async fn get(&self, identity: &RomIdentity) -> Result<Option<Vec<u8>>>;

    /// Removes the record for `identity`. Deleting a missing record succeeds.
    async fn delete(&self, identity: &RomIdentity) -> Result<()>;

    /// Lists every stored identity. Ordering is unspecified.
    async fn list_keys(&self) -> Result<Vec<RomIdentity>>;

    /// Returns true if a record exists for `identity`.
    async fn contains(&self, identity: &RomIdentity) -> Result<bool> {
        Ok(self.get(identity).await?.is_some())
    }
}
