//! Session state, status messages and the view published to the presentation layer.

pub mod model;
pub mod status;

pub use model::{LoadOutcome, SaveOutcome, SessionState, SessionView};
pub use status::Status;
