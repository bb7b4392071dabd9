//! Tag access traits.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! so they are not object-safe. Use generics, or the enum wrappers in
//! [`devices`](crate::devices) where a concrete type is needed.

#![allow(async_fn_in_trait)]

use crate::{
    Result,
    types::{TagCapabilities, TechProfile},
};
use std::time::Duration;
use tagvault_core::{LockOutcome, LockStatus, TagContent, UnlockOutcome};

/// Low-level access to the NFC radio and the tag in its field.
///
/// A caller must [`claim`](TagAccess::claim) the radio for a technology
/// profile before any other operation and must call
/// [`release`](TagAccess::release) afterwards on every path. Claiming again
/// while claimed re-negotiates the session for the new profile.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use tagvault_hardware::traits::TagAccess;
/// use tagvault_hardware::types::TechProfile;
/// use tagvault_hardware::Result;
///
/// async fn read_text<A: TagAccess>(access: &mut A) -> Result<Option<String>> {
///     access.claim(TechProfile::Ndef, Duration::from_secs(10)).await?;
///     let text = access.read_ndef_text().await;
///     access.release();
///     text
/// }
/// ```
pub trait TagAccess: Send + Sync {
    /// Open a radio session for `profile`, waiting up to `timeout` for a tag.
    ///
    /// # Errors
    /// - `Timeout` if no tag enters the field in time
    /// - `Unsupported` if the tag does not offer `profile`
    /// - `Unavailable` if NFC is off or absent
    /// - `Cancelled` if the user dismissed the session
    async fn claim(&mut self, profile: TechProfile, timeout: Duration) -> Result<()>;

    /// Close the radio session. Safe to call when nothing is claimed.
    fn release(&mut self);

    /// Describe the tag in the field, if any.
    async fn discover(&mut self) -> Result<Option<TagCapabilities>>;

    /// Read the text of the tag's NDEF text record; `None` for a blank tag.
    async fn read_ndef_text(&mut self) -> Result<Option<String>>;

    /// Replace the tag's NDEF message with a single text record.
    async fn write_ndef_text(&mut self, text: &str) -> Result<()>;

    /// Read one 4-byte page. Requires a [`TechProfile::PageAccess`] claim.
    async fn read_page(&mut self, page: u8) -> Result<[u8; 4]>;

    /// Write one 4-byte page. Requires a [`TechProfile::PageAccess`] claim.
    async fn write_page(&mut self, page: u8, data: [u8; 4]) -> Result<()>;

    /// Send PWD_AUTH and return the 2-byte PACK on success.
    ///
    /// # Errors
    /// `AuthenticationFailed` if the tag answers with a NAK.
    async fn authenticate(&mut self, password: [u8; 4]) -> Result<[u8; 2]>;
}

/// The operation surface shared by the real and the simulated backend.
///
/// Errors are user-facing `tagvault_core::Error` values; the `Display` text
/// of each is what the UI shows.
pub trait TagBackend: Send + Sync {
    async fn read_tag(&self) -> tagvault_core::Result<TagContent>;

    async fn write_tag(&self, payload: &serde_json::Value) -> tagvault_core::Result<()>;

    async fn format_tag(&self) -> tagvault_core::Result<()>;

    async fn lock_tag(&self, password: &str) -> tagvault_core::Result<LockOutcome>;

    async fn unlock_tag(&self, password: &str) -> tagvault_core::Result<UnlockOutcome>;

    async fn is_tag_locked(&self) -> tagvault_core::Result<LockStatus>;
}
