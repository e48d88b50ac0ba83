use serde::{Deserialize, Serialize};
use strum::Display;

use super::status::Status;
use crate::identity::RomIdentity;

/// Lifecycle state of the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
pub enum SessionState {
    /// No ROM loaded.
    #[default]
    Idle,
    /// Module loading or ROM writing in progress.
    Booting,
    /// Emulator actively executing.
    Running,
    /// Emulator suspended, state retained.
    Paused,
}

/// Snapshot of the controller published to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub status: Status,
    pub state: SessionState,
    pub rom_name: Option<String>,
    pub identity: Option<RomIdentity>,
}

impl SessionView {
    /// True while a ROM is executing or paused.
    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running | SessionState::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.state == SessionState::Paused
    }

    /// Identity preview for display, or a placeholder when no ROM is loaded.
    pub fn identity_preview(&self) -> String {
        self.identity
            .as_ref()
            .map(RomIdentity::preview)
            .unwrap_or_else(|| "No ROM loaded".to_string())
    }
}

/// Result of a save request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No session is active; nothing to save.
    NoSession,
    /// The core has not written a save file yet.
    NoSaveData,
    /// The save file was committed to the store.
    Saved { bytes: usize },
    /// The request belonged to a superseded session and was dropped.
    Stale,
}

/// Result of a load-from-store request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    NoSession,
    NoStoredSave,
    Loaded { bytes: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::digest;

    #[test]
    fn test_view_flags() {
        let mut view = SessionView::default();
        assert!(!view.is_running());
        assert_eq!(view.identity_preview(), "No ROM loaded");

        view.state = SessionState::Paused;
        view.identity = Some(digest(b"abc"));
        assert!(view.is_running());
        assert!(view.is_paused());
        assert_eq!(view.identity_preview(), "ba7816bf8f01…");
    }

    #[test]
    fn test_status_text() {
        assert_eq!(Status::default().to_string(), "Upload a .gba ROM to begin.");
        assert!(Status::SaveFailed.is_failure());
        assert!(!Status::NoSaveYet.is_failure());
    }
}
