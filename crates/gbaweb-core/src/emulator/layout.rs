//! Canonical locations of ROM and save files inside the emulator filesystem.

use serde::{Deserialize, Serialize};

use crate::identity::RomIdentity;

pub const DEFAULT_ROM_DIRECTORY: &str = "/roms";
pub const DEFAULT_SAVE_DIRECTORY: &str = "/saves";
pub const ROM_EXTENSION: &str = "gba";
pub const SAVE_EXTENSION: &str = "sav";

/// Directory pair under which every session's files are namespaced by identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsLayout {
    pub rom_directory: String,
    pub save_directory: String,
}

impl Default for FsLayout {
    fn default() -> Self {
        Self {
            rom_directory: DEFAULT_ROM_DIRECTORY.to_string(),
            save_directory: DEFAULT_SAVE_DIRECTORY.to_string(),
        }
    }
}

impl FsLayout {
    pub fn new(rom_directory: impl Into<String>, save_directory: impl Into<String>) -> Self {
        Self {
            rom_directory: rom_directory.into(),
            save_directory: save_directory.into(),
        }
    }

    /// `<rom_directory>/<identity>.gba`
    pub fn rom_path(&self, identity: &RomIdentity) -> String {
        join(&self.rom_directory, &format!("{identity}.{ROM_EXTENSION}"))
    }

    /// `<save_directory>/<identity>.sav`
    pub fn save_path(&self, identity: &RomIdentity) -> String {
        join(&self.save_directory, &format!("{identity}.{SAVE_EXTENSION}"))
    }
}

fn join(directory: &str, file_name: &str) -> String {
    format!("{}/{}", directory.trim_end_matches('/'), file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::digest;

    #[test]
    fn test_default_paths() {
        let layout = FsLayout::default();
        let id = digest(b"rom");
        assert_eq!(layout.rom_path(&id), format!("/roms/{id}.gba"));
        assert_eq!(layout.save_path(&id), format!("/saves/{id}.sav"));
    }

    #[test]
    fn test_trailing_slash_is_normalized() {
        let layout = FsLayout::new("/data/roms/", "/data/saves/");
        let id = digest(b"rom");
        assert_eq!(layout.rom_path(&id), format!("/data/roms/{id}.gba"));
        assert_eq!(layout.save_path(&id), format!("/data/saves/{id}.sav"));
    }

    #[test]
    fn test_paths_are_namespaced_by_identity() {
        let layout = FsLayout::default();
        assert_ne!(
            layout.save_path(&digest(b"rom a")),
            layout.save_path(&digest(b"rom b"))
        );
    }
}
