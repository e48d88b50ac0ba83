use std::path::Path;

use anyhow::{Context, Result, bail};
use gbaweb_core::identity::RomIdentity;

/// Reads a ROM image and computes its identity.
pub async fn identify(rom: &Path) -> Result<RomIdentity> {
    let bytes = tokio::fs::read(rom)
        .await
        .with_context(|| format!("Failed to read ROM {}", rom.display()))?;
    if bytes.is_empty() {
        bail!("ROM {} is empty", rom.display());
    }
    Ok(RomIdentity::digest(&bytes))
}

pub async fn run(rom: &Path) -> Result<()> {
    let identity = identify(rom).await?;
    println!("{}  {}", identity, rom.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_identify_matches_digest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("game.gba");
        std::fs::write(&path, b"abc").unwrap();

        let identity = identify(&path).await.unwrap();

        assert_eq!(
            identity.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_identify_rejects_empty_rom() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.gba");
        std::fs::write(&path, b"").unwrap();

        assert!(identify(&path).await.is_err());
    }
}
