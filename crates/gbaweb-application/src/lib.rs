//! Application layer: the session controller and the filesystem bridge it
//! drives the emulator module through.

pub mod bridge;
pub mod session;

pub use bridge::VirtualFsBridge;
pub use session::{SaveSeed, SessionController};
