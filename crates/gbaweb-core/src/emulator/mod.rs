//! Contracts for the opaque emulator module and its private filesystem.

pub mod fs;
pub mod layout;
pub mod module;

pub use fs::{FsError, FsResult, VirtualFs};
pub use layout::FsLayout;
pub use module::{
    EmulatorModule, EntryPoint, Launch, ModuleLoader, PAUSE_ENTRY_POINTS, RESUME_ENTRY_POINTS,
    START_ENTRY_POINTS, TEARDOWN_ENTRY_POINTS,
};
