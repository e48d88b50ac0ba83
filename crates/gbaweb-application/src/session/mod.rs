//! Emulation session lifecycle.

pub mod autosave;
pub mod controller;


pub use autosave::AutosaveTask;
pub use controller::{SaveSeed, SessionController};
