//! User-facing status messages.

use serde::{Deserialize, Serialize};
use strum::Display;

/// The status line shown by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[strum(to_string = "Upload a .gba ROM to begin.")]
    AwaitingRom,
    #[strum(to_string = "Processing ROM...")]
    ProcessingRom,
    #[strum(to_string = "Initializing emulator core...")]
    InitializingCore,
    #[strum(to_string = "Could not load the emulator core.")]
    CoreLoadFailed,
    #[strum(to_string = "Could not load the ROM.")]
    RomLoadFailed,
    #[strum(to_string = "Could not start the ROM.")]
    RomStartFailed,
    #[strum(to_string = "ROM loaded. Enjoy!")]
    RomLoaded,
    #[strum(to_string = "ROM loaded with previous save.")]
    RomLoadedWithSave,
    #[strum(to_string = "Game saved.")]
    Saved,
    #[strum(to_string = "Autosave complete.")]
    Autosaved,
    #[strum(to_string = "The game has not written a save file yet.")]
    NoSaveYet,
    #[strum(to_string = "Could not save the game.")]
    SaveFailed,
    #[strum(to_string = "Load a ROM before saving the game.")]
    LoadRomBeforeSaving,
    #[strum(to_string = "Load a ROM before loading a saved game.")]
    LoadRomBeforeLoading,
    #[strum(to_string = "No saved game in the store for this ROM.")]
    NoStoredSave,
    #[strum(to_string = "Game loaded from the save store.")]
    LoadedFromStore,
    #[strum(to_string = "Could not load the saved game.")]
    LoadFailed,
    #[strum(to_string = "No active emulation.")]
    NoActiveEmulation,
    #[strum(to_string = "Emulation paused.")]
    Paused,
    #[strum(to_string = "Could not pause the emulator.")]
    PauseFailed,
    #[strum(to_string = "Emulation resumed.")]
    Resumed,
    #[strum(to_string = "Could not resume the emulator.")]
    ResumeFailed,
    #[strum(to_string = "Emulator closed.")]
    Closed,
}

impl Status {
    /// Returns true for statuses that report a failed user action.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Status::CoreLoadFailed
                | Status::RomLoadFailed
                | Status::RomStartFailed
                | Status::SaveFailed
                | Status::LoadFailed
                | Status::PauseFailed
                | Status::ResumeFailed
        )
    }
}
