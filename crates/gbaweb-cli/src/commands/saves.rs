use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use gbaweb_core::identity::RomIdentity;
use gbaweb_core::save::SaveRepository;

pub fn parse_identity(id: &str) -> Result<RomIdentity> {
    id.parse::<RomIdentity>()
        .with_context(|| format!("'{id}' is not a ROM identity"))
}

pub async fn list(repo: &dyn SaveRepository, out: &mut impl Write) -> Result<()> {
    let mut keys = repo.list_keys().await?;
    keys.sort();

    if keys.is_empty() {
        writeln!(out, "No saves stored.")?;
        return Ok(());
    }
    for identity in keys {
        // A record deleted between listing and reading is skipped
        if let Some(save) = repo.get(&identity).await? {
            writeln!(out, "{}  {} bytes", identity, save.len())?;
        }
    }
    Ok(())
}

pub async fn export(
    repo: &dyn SaveRepository,
    id: &str,
    dest: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let identity = parse_identity(id)?;
    let Some(save) = repo.get(&identity).await? else {
        bail!("No save stored for {}", identity);
    };
    tokio::fs::write(dest, &save)
        .await
        .with_context(|| format!("Failed to write {}", dest.display()))?;
    writeln!(out, "Exported {} bytes to {}", save.len(), dest.display())?;
    Ok(())
}

pub async fn import(
    repo: &dyn SaveRepository,
    identity: &RomIdentity,
    source: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let save = tokio::fs::read(source)
        .await
        .with_context(|| format!("Failed to read {}", source.display()))?;
    repo.put(identity, &save).await?;
    tracing::info!("[Cli] Imported {} bytes for {}", save.len(), identity);
    writeln!(out, "Imported {} bytes for {}", save.len(), identity)?;
    Ok(())
}

pub async fn delete(repo: &dyn SaveRepository, id: &str, out: &mut impl Write) -> Result<()> {
    let identity = parse_identity(id)?;
    repo.delete(&identity).await?;
    writeln!(out, "Deleted save for {}", identity)?;
    Ok(())
}
