//! Shared types, constants and the error taxonomy for TagVault.
//!
//! Every other crate in the workspace returns [`Error`] across its public
//! surface, so the user-facing message of a failure is decided here once.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
