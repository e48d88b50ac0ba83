//! Storage primitives shared by the save store and the config service.

pub mod atomic_file;
pub mod manifest;

pub use atomic_file::{AtomicFile, AtomicFileError};
pub use manifest::StoreManifest;
