//! Lock envelope written in place of plain content by a software lock.
//!
//! ```json
//! {
//!   "locked": true,
//!   "timestamp": "2026-01-01T12:00:00.000Z",
//!   "hint": "This tag is password protected. ...",
//!   "hasContent": true,
//!   "encryptedContent": "KFNFRkw="
//! }
//! ```

use crate::cipher;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tagvault_core::{Password, Result, constants::LOCK_HINT};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockEnvelope {
    pub locked: bool,

    /// RFC 3339 time the lock was applied.
    #[serde(default)]
    pub timestamp: String,

    #[serde(default)]
    pub hint: String,

    pub has_content: bool,

    /// Base64 ciphertext of the original content; empty when
    /// `has_content` is false.
    #[serde(default)]
    pub encrypted_content: String,
}

impl LockEnvelope {
    /// Seal the current tag content under `password`, stamped with the
    /// current time.
    pub fn seal(content: Option<&str>, password: &Password) -> Self {
        Self::seal_at(content, password, Utc::now())
    }

    /// Seal with an explicit timestamp.
    ///
    /// Empty content is treated as no content.
    pub fn seal_at(content: Option<&str>, password: &Password, at: DateTime<Utc>) -> Self {
        let content = content.filter(|c| !c.is_empty());

        Self {
            locked: true,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            hint: LOCK_HINT.to_string(),
            has_content: content.is_some(),
            encrypted_content: content
                .map(|c| cipher::encrypt(c, password))
                .unwrap_or_default(),
        }
    }

    /// Parse tag text as an envelope.
    ///
    /// Returns `None` for anything that is not a JSON object with
    /// `locked: true`, so ordinary content never reads as locked.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str::<Self>(text)
            .ok()
            .filter(|envelope| envelope.locked)
    }

    pub fn is_envelope(text: &str) -> bool {
        Self::parse(text).is_some()
    }

    /// Serialize for writing to the tag.
    ///
    /// # Errors
    /// Returns `Error::InvalidPayload` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Recover the original content.
    ///
    /// # Errors
    /// - `Error::IncorrectPassword` if the password does not decrypt the
    ///   content to plausible text
    /// - `Error::InvalidPayload` if the ciphertext is corrupted
    pub fn open(&self, password: &Password) -> Result<Option<String>> {
        if !self.has_content || self.encrypted_content.is_empty() {
            return Ok(None);
        }
        cipher::decrypt(&self.encrypted_content, password).map(Some)
    }
}
