//! Error types for the GBAWEB save-persistence stack.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for every GBAWEB crate.
///
/// The first group of variants mirrors the failure taxonomy of a boot or save
/// round-trip; the second group covers the ambient concerns (config, I/O,
/// serialization) shared by the infrastructure layer.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum GbaError {
    /// The emulator module failed to load or exposes no filesystem.
    #[error("Emulator module unavailable: {0}")]
    ModuleUnavailable(String),

    /// None of the probed start entry points is exported by the module.
    #[error("Emulator module exports no known start entry point")]
    StartMethodMissing,

    /// Creating a canonical directory failed for a reason other than "already exists".
    #[error("Failed to create directory '{path}': {message}")]
    DirectoryCreate { path: String, message: String },

    /// Removing a stale ROM file failed.
    #[error("Failed to remove stale file '{path}': {message}")]
    StaleFileRemoval { path: String, message: String },

    /// Any other virtual filesystem failure (writing the ROM, reading the save).
    #[error("Virtual filesystem error at '{path}': {message}")]
    Filesystem { path: String, message: String },

    /// The durable save store cannot be reached (quota, permissions, corruption).
    #[error("Save store unavailable: {0}")]
    StoreUnavailable(String),

    /// Stopping the previous emulator instance failed.
    #[error("Failed to stop previous emulator instance: {0}")]
    PreviousInstanceTeardown(String),

    /// The module exports none of the entry points needed for a control request.
    #[error("Emulator module cannot {0}")]
    ControlUnavailable(String),

    /// A start or control entry point raised an error.
    #[error("Emulator entry point '{entry}' failed: {message}")]
    EntryPoint { entry: String, message: String },

    /// A ROM buffer with no bytes was supplied.
    #[error("ROM image is empty")]
    EmptyRom,

    /// A string could not be parsed as a ROM identity.
    #[error("Invalid ROM identity: '{0}'")]
    InvalidIdentity(String),

    /// The operation requires an active session.
    #[error("No active session")]
    NoActiveSession,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (host file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GbaError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a ModuleUnavailable error
    pub fn module_unavailable(message: impl Into<String>) -> Self {
        Self::ModuleUnavailable(message.into())
    }

    /// Creates a StoreUnavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Creates a Filesystem error
    pub fn filesystem(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Filesystem {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a StoreUnavailable error
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Check if this is a ModuleUnavailable error
    pub fn is_module_unavailable(&self) -> bool {
        matches!(self, Self::ModuleUnavailable(_))
    }

    /// Returns true for errors that abort a boot attempt and leave the
    /// controller idle.
    ///
    /// Directory creation, stale file removal and previous-instance teardown
    /// failures are logged by the boot sequence and never reach this check.
    pub fn is_fatal_to_boot(&self) -> bool {
        matches!(
            self,
            Self::ModuleUnavailable(_)
                | Self::StartMethodMissing
                | Self::EntryPoint { .. }
                | Self::Filesystem { .. }
                | Self::EmptyRom
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for GbaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for GbaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for GbaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for GbaError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, GbaError>`.
pub type Result<T> = std::result::Result<T, GbaError>;
