pub mod config;
pub mod emulator;
pub mod error;
pub mod identity;
pub mod save;
pub mod session;

// Re-export common types
pub use error::GbaError;
pub use identity::{RomIdentity, digest};
