use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gbaweb_infrastructure::{AsyncDirSaveRepository, ConfigService, GbaPaths};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "gbaweb")]
#[command(about = "GBAWEB CLI - inspect and manage GBA battery saves", long_about = None)]
struct Cli {
    /// Store root (defaults to the platform data directory)
    #[arg(long, global = true, value_name = "DIR")]
    store: Option<PathBuf>,

    /// Configuration file (defaults to ~/.config/gbaweb/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write logs to a daily rolling file
    #[arg(long, global = true)]
    log_file: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the identity a ROM's saves are stored under
    Digest {
        /// ROM image
        rom: PathBuf,
    },
    /// Manage the save store
    Saves {
        #[command(subcommand)]
        action: SavesAction,
    },
}

#[derive(Subcommand)]
enum SavesAction {
    /// List stored saves
    List,
    /// Copy a stored save to a file
    Export {
        /// ROM identity
        id: String,
        /// Destination file
        out: PathBuf,
    },
    /// Store a save file for a ROM
    Import {
        /// ROM identity, or a ROM image path with --rom
        target: String,
        /// Save file to import
        sav: PathBuf,
        /// Treat TARGET as a ROM image and derive its identity
        #[arg(long)]
        rom: bool,
    },
    /// Delete a stored save
    Delete {
        /// ROM identity
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_service = match &cli.config {
        Some(path) => ConfigService::with_path(path.clone()),
        None => ConfigService::new()?,
    };
    let config = config_service
        .get_config()
        .context("Failed to load configuration")?;

    let log_dir = match (&config.logging.directory, cli.log_file) {
        (Some(dir), _) => Some(dir.clone()),
        (None, true) => Some(GbaPaths::new(None).logs_dir()?),
        (None, false) => None,
    };
    let _guard = logging::init(cli.verbose, log_dir.as_deref())?;

    match cli.command {
        Commands::Digest { rom } => commands::digest::run(&rom).await?,
        Commands::Saves { action } => {
            let base = cli.store.as_deref().or(config.store.base_dir.as_deref());
            let repo = AsyncDirSaveRepository::new(base)
                .await
                .context("Failed to open save store")?;
            tracing::debug!("[Cli] Using save store at {:?}", repo.base_dir());

            let mut out = std::io::stdout();
            match action {
                SavesAction::List => commands::saves::list(&repo, &mut out).await?,
                SavesAction::Export { id, out: path } => {
                    commands::saves::export(&repo, &id, &path, &mut out).await?
                }
                SavesAction::Import { target, sav, rom } => {
                    let identity = if rom {
                        commands::digest::identify(std::path::Path::new(&target)).await?
                    } else {
                        commands::saves::parse_identity(&target)?
                    };
                    commands::saves::import(&repo, &identity, &sav, &mut out).await?
                }
                SavesAction::Delete { id } => commands::saves::delete(&repo, &id, &mut out).await?,
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_accepts_rom_flag() {
        let cli = Cli::try_parse_from([
            "gbaweb", "saves", "import", "--rom", "game.gba", "game.sav", "--store", "/tmp/s",
        ])
        .unwrap();

        assert_eq!(cli.store, Some(PathBuf::from("/tmp/s")));
        match cli.command {
            Commands::Saves {
                action: SavesAction::Import { target, sav, rom },
            } => {
                assert_eq!(target, "game.gba");
                assert_eq!(sav, PathBuf::from("game.sav"));
                assert!(rom);
            }
            _ => panic!("expected saves import"),
        }
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::try_parse_from(["gbaweb", "-vv", "digest", "game.gba"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.log_file);
    }

    #[test]
    fn test_export_requires_destination() {
        assert!(Cli::try_parse_from(["gbaweb", "saves", "export", "abc"]).is_err());
    }
}
