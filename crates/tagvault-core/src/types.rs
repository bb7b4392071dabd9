use crate::{
    Result,
    constants::{MIN_PASSWORD_LENGTH, PASSWORD_BYTES},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Unique tag identifier (UID bytes), rendered as upper-case hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TagId(Vec<u8>);

impl TagId {
    /// Create a tag identifier from raw UID bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw UID bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Upper-case hex rendering, e.g. `04A1B2C3D4E5F6`.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.0)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for TagId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        hex::decode(s.trim())
            .map(Self)
            .map_err(|e| Error::InvalidPayload(format!("Invalid tag id {s:?}: {e}")))
    }
}

impl From<TagId> for String {
    fn from(id: TagId) -> Self {
        id.to_hex()
    }
}

impl TryFrom<String> for TagId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// A tag password.
///
/// # Security
/// `Debug` never prints the secret and comparisons run in constant time.
#[derive(Clone, Eq)]
pub struct Password(String);

impl Password {
    /// Validate a password for locking (at least [`MIN_PASSWORD_LENGTH`]
    /// characters).
    ///
    /// # Errors
    /// Returns `Error::InvalidPassword` for shorter passwords.
    pub fn for_lock(password: &str) -> Result<Self> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::InvalidPassword {
                min_length: MIN_PASSWORD_LENGTH,
            });
        }
        Ok(Self(password.to_string()))
    }

    /// Validate a password for unlocking (non-empty).
    ///
    /// # Errors
    /// Returns `Error::PasswordRequired` for an empty password.
    pub fn for_unlock(password: &str) -> Result<Self> {
        if password.is_empty() {
            return Err(Error::PasswordRequired);
        }
        Ok(Self(password.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The 4-byte hardware password: the first four UTF-8 bytes, zero padded.
    #[must_use]
    pub fn page_bytes(&self) -> [u8; PASSWORD_BYTES] {
        let mut bytes = [0u8; PASSWORD_BYTES];
        for (slot, byte) in bytes.iter_mut().zip(self.0.as_bytes()) {
            *slot = *byte;
        }
        bytes
    }

    /// Constant-time comparison against a stored password.
    #[must_use]
    pub fn matches(&self, stored: &str) -> bool {
        self.0.as_bytes().ct_eq(stored.as_bytes()).into()
    }

    /// Constant-time comparison of the 4-byte hardware passwords only, the
    /// way the chip checks PWD_AUTH.
    #[must_use]
    pub fn matches_page(&self, stored: &str) -> bool {
        let stored = Self(stored.to_string()).page_bytes();
        self.page_bytes()[..].ct_eq(&stored[..]).into()
    }
}

impl PartialEq for Password {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Password(****)")
    }
}

/// How a tag is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockType {
    /// Chip-level password protection (PWD_AUTH).
    Hardware,

    /// Content replaced by an encrypted lock envelope.
    Software,
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Hardware => write!(f, "hardware"),
            Self::Software => write!(f, "software"),
        }
    }
}

/// Result of a successful lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockOutcome {
    pub lock_type: LockType,
}

/// Result of a successful unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockOutcome {
    pub lock_type: LockType,

    /// Plain content restored onto the tag, if any existed before locking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restored_content: Option<String>,
}

/// Lock state reported by `is_tag_locked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStatus {
    pub locked: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_type: Option<LockType>,
}

impl LockStatus {
    #[must_use]
    pub fn unlocked() -> Self {
        Self {
            locked: false,
            lock_type: None,
        }
    }

    #[must_use]
    pub fn locked(lock_type: LockType) -> Self {
        Self {
            locked: true,
            lock_type: Some(lock_type),
        }
    }
}

/// Content read from a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagContent {
    /// Hex UID for physical tags, fixture id for simulated tags.
    pub tag_id: String,

    /// Decoded payload; `None` for a blank tag.
    pub content: Option<serde_json::Value>,
}

/// Tagged result handed to the UI layer.
///
/// ```json
/// {"success": true, "lockType": "hardware"}
/// {"success": false, "error": "Incorrect password"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse<T> {
    pub success: bool,

    #[serde(flatten)]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> From<Result<T>> for TagResponse<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
            },
            Err(error) => Self {
                success: false,
                data: None,
                error: Some(error.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vec![0x04, 0xA1, 0xB2, 0xC3], "04A1B2C3")]
    #[case(vec![0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66], "04112233445566")]
    fn test_tag_id_hex(#[case] bytes: Vec<u8>, #[case] expected: &str) {
        let id = TagId::new(bytes.clone());
        assert_eq!(id.to_hex(), expected);
        assert_eq!(id.to_string(), expected);

        let parsed: TagId = expected.parse().unwrap();
        assert_eq!(parsed.as_bytes(), bytes.as_slice());
    }

    #[test]
    fn test_tag_id_serializes_as_hex_string() {
        let id = TagId::new(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"DEADBEEF\"");
        assert!("XYZ".parse::<TagId>().is_err());
    }

    #[rstest]
    #[case("1234")]
    #[case("secret")]
    #[case("päss")]
    fn test_password_for_lock_valid(#[case] input: &str) {
        assert!(Password::for_lock(input).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    fn test_password_for_lock_invalid(#[case] input: &str) {
        assert_eq!(
            Password::for_lock(input).unwrap_err(),
            Error::InvalidPassword { min_length: 4 }
        );
    }

    #[test]
    fn test_password_for_unlock() {
        assert_eq!(
            Password::for_unlock("").unwrap_err(),
            Error::PasswordRequired
        );
        assert!(Password::for_unlock("x").is_ok());
    }

    #[test]
    fn test_password_page_bytes() {
        let password = Password::for_lock("secret").unwrap();
        assert_eq!(password.page_bytes(), *b"secr");

        let short = Password::for_unlock("ab").unwrap();
        assert_eq!(short.page_bytes(), [b'a', b'b', 0, 0]);
    }

    #[rstest]
    #[case("secret", true)]
    #[case("secr", true)]
    #[case("secrXYZ", true)]
    #[case("secreu", true)]
    #[case("sec", false)]
    #[case("Secret", false)]
    fn test_password_matches_page(#[case] input: &str, #[case] expected: bool) {
        let password = Password::for_unlock(input).unwrap();
        assert_eq!(password.matches_page("secret"), expected);
        assert!(!password.matches("secret") || input == "secret");
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let password = Password::for_lock("hunter22").unwrap();
        assert!(!format!("{password:?}").contains("hunter"));
        assert!(password.matches("hunter22"));
        assert!(!password.matches("hunter2"));
    }

    #[test]
    fn test_response_success_serialization() {
        let response: TagResponse<LockOutcome> = Ok(LockOutcome {
            lock_type: LockType::Hardware,
        })
        .into();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": true, "lockType": "hardware"})
        );
    }

    #[test]
    fn test_response_error_serialization() {
        let response: TagResponse<UnlockOutcome> = Err(Error::IncorrectPassword).into();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "Incorrect password"})
        );
    }

    #[test]
    fn test_lock_status_serialization() {
        let json = serde_json::to_value(LockStatus::unlocked()).unwrap();
        assert_eq!(json, serde_json::json!({"locked": false}));

        let json = serde_json::to_value(LockStatus::locked(LockType::Software)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"locked": true, "lockType": "software"})
        );
    }
}
