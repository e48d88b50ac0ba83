//! Capability-probed view of the emulator module.
//!
//! Builds of the emulator core export different entry point names. Instead of
//! assuming one fixed API, callers ask the module which [`EntryPoint`]s it
//! supports and walk the fixed priority lists below.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use super::fs::VirtualFs;
use crate::error::Result;

/// An entry point an emulator module build may export.
///
/// The `Display` form is the exported name, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum EntryPoint {
    /// `loadRom(bytes, { path })`
    #[strum(to_string = "loadRom")]
    LoadRom,
    /// `loadROM(bytes, path)`
    #[strum(to_string = "loadROM")]
    LoadRomLegacy,
    /// `open(path)`
    #[strum(to_string = "open")]
    Open,
    /// `callMain([path])`
    #[strum(to_string = "callMain")]
    CallMain,
    /// `run()`
    #[strum(to_string = "run")]
    Run,
    #[strum(to_string = "pauseMainLoop")]
    PauseMainLoop,
    #[strum(to_string = "resumeMainLoop")]
    ResumeMainLoop,
    #[strum(to_string = "setPaused(true)")]
    SetPaused,
    #[strum(to_string = "setPaused(false)")]
    ClearPaused,
    /// Exported C symbol `gba_pause`
    #[strum(to_string = "gba_pause")]
    ExportedPause,
    /// Exported C symbol `gba_resume`
    #[strum(to_string = "gba_resume")]
    ExportedResume,
    #[strum(to_string = "exit")]
    Exit,
    #[strum(to_string = "quit")]
    Quit,
}

/// Start entry points in probing order; the first supported one is used.
pub const START_ENTRY_POINTS: &[EntryPoint] = &[
    EntryPoint::LoadRom,
    EntryPoint::LoadRomLegacy,
    EntryPoint::Open,
    EntryPoint::CallMain,
    EntryPoint::Run,
];

/// Every supported entry is invoked, in order.
pub const PAUSE_ENTRY_POINTS: &[EntryPoint] = &[
    EntryPoint::PauseMainLoop,
    EntryPoint::SetPaused,
    EntryPoint::ExportedPause,
];

/// Every supported entry is invoked, in order.
pub const RESUME_ENTRY_POINTS: &[EntryPoint] = &[
    EntryPoint::ResumeMainLoop,
    EntryPoint::ClearPaused,
    EntryPoint::ExportedResume,
];

/// Best-effort shutdown sequence for an instance being replaced or disposed.
pub const TEARDOWN_ENTRY_POINTS: &[EntryPoint] =
    &[EntryPoint::PauseMainLoop, EntryPoint::Exit, EntryPoint::Quit];

impl EntryPoint {
    pub fn is_start(self) -> bool {
        START_ENTRY_POINTS.contains(&self)
    }
}

/// Arguments handed to a start entry point.
#[derive(Debug, Clone, Copy)]
pub struct Launch<'a> {
    pub rom: &'a [u8],
    pub rom_path: &'a str,
}

/// A loaded emulator module instance.
#[async_trait]
pub trait EmulatorModule: Send + Sync {
    /// The module's private filesystem, if this build exposes one.
    fn filesystem(&self) -> Option<Arc<dyn VirtualFs>>;

    /// Returns true if this build exports `entry`.
    fn supports(&self, entry: EntryPoint) -> bool;

    /// Starts core execution through a start entry point.
    ///
    /// Only called with entries for which [`EmulatorModule::supports`]
    /// returned true and [`EntryPoint::is_start`] holds.
    async fn start(&self, entry: EntryPoint, launch: Launch<'_>) -> Result<()>;

    /// Invokes a control entry point (pause, resume, exit, quit).
    fn control(&self, entry: EntryPoint) -> Result<()>;

    /// Returns the first entry of `candidates` this module supports.
    fn probe(&self, candidates: &[EntryPoint]) -> Option<EntryPoint> {
        candidates.iter().copied().find(|entry| self.supports(*entry))
    }
}

/// Asynchronously loads (or instantiates) the emulator module.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn EmulatorModule>>;
}
