//! Tag access layer for TagVault.
//!
//! This crate defines the radio-level contract the security service drives
//! ([`TagAccess`]), the backend surface shared with the simulator
//! ([`TagBackend`]), and the implementations of the radio contract:
//!
//! - [`mock::MockReader`]: an in-memory NTAG model for tests and demos
//! - `pcsc::PcscReader`: ACR122U-compatible PC/SC readers (feature
//!   `hardware-pcsc`)
//!
//! # Sessions
//!
//! Every operation runs inside a claimed radio session:
//!
//! ```text
//! claim(Ndef) ─> discover ─> [claim(PageAccess) ─> pages/PWD_AUTH] ─> release
//! ```
//!
//! `release` is synchronous and idempotent so it can run from `Drop`.
//!
//! # Error Handling
//!
//! All radio operations return [`Result<T>`][error::Result] with a
//! [`HardwareError`]. The security layer translates these into the
//! user-facing `tagvault_core::Error`.

pub mod devices;
pub mod error;
pub mod mock;
#[cfg(feature = "hardware-pcsc")]
pub mod pcsc;
pub mod traits;
mod transfer;
pub mod types;

pub use error::{HardwareError, Result};
pub use traits::{TagAccess, TagBackend};
pub use types::{PasswordPages, TagCapabilities, TagTechnology, TechProfile};
