//! Durable save store contract.

pub mod repository;

pub use repository::SaveRepository;

/// Namespace holding every save record.
pub const SAVES_NAMESPACE: &str = "saves";

/// Schema version of the save namespace.
pub const SCHEMA_VERSION: u32 = 1;
