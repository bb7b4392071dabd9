use thiserror::Error;

/// Errors surfaced by tag operations.
///
/// The `Display` text of each variant is the stable, user-facing message
/// returned to callers across the service boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Password validation
    #[error("Password must be at least {min_length} characters")]
    InvalidPassword { min_length: usize },

    #[error("Password is required")]
    PasswordRequired,

    // Tag presence and capabilities
    #[error("No NFC tag detected. Hold the tag near the device and try again")]
    TagNotPresent,

    #[error("Tag is read-only")]
    ReadOnlyTag,

    #[error("Data too large for tag: {size} bytes exceeds capacity of {capacity} bytes")]
    CapacityExceeded { size: usize, capacity: usize },

    #[error("NFC is not available on this device")]
    HardwareUnavailable,

    #[error("Operation cancelled")]
    OperationCancelled,

    // Lock state
    #[error("Tag is already locked")]
    AlreadyLocked,

    #[error("Tag is not locked")]
    NotLocked,

    #[error("Tag is locked")]
    TagLocked,

    #[error("Incorrect password")]
    IncorrectPassword,

    // Writes
    #[error("Failed to write to tag after {attempts} attempt(s): {message}")]
    WriteFailed { attempts: u32, message: String },

    // Content
    #[error("Invalid NDEF data: {0}")]
    InvalidNdef(String),

    #[error("Invalid tag payload: {0}")]
    InvalidPayload(String),

    // Simulator
    #[error("Tag not found: {0}")]
    UnknownTag(String),

    #[error("Simulated NFC failure during {operation}")]
    SimulatedFailure { operation: String },

    // Configuration
    #[error("Configuration error: {0}")]
    Config(String),

    // Anything without a dedicated message
    #[error("Failed to {operation}: {message}")]
    OperationFailed { operation: String, message: String },
}

impl Error {
    /// Create a generic "failed to <operation>" error.
    pub fn operation_failed(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Create a capacity error.
    pub fn capacity_exceeded(size: usize, capacity: usize) -> Self {
        Self::CapacityExceeded { size, capacity }
    }

    /// Whether this error is a definitive answer about the tag or the
    /// request rather than a transient transport problem.
    ///
    /// Definitive errors are never retried and never trigger a strategy
    /// fallback.
    pub fn is_definitive(&self) -> bool {
        matches!(
            self,
            Self::InvalidPassword { .. }
                | Self::PasswordRequired
                | Self::TagNotPresent
                | Self::ReadOnlyTag
                | Self::CapacityExceeded { .. }
                | Self::AlreadyLocked
                | Self::NotLocked
                | Self::TagLocked
                | Self::IncorrectPassword
                | Self::OperationCancelled
                | Self::HardwareUnavailable
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(
            Error::InvalidPassword { min_length: 4 }.to_string(),
            "Password must be at least 4 characters"
        );
        assert_eq!(Error::IncorrectPassword.to_string(), "Incorrect password");
        assert_eq!(
            Error::capacity_exceeded(505, 504).to_string(),
            "Data too large for tag: 505 bytes exceeds capacity of 504 bytes"
        );
        assert_eq!(
            Error::WriteFailed {
                attempts: 3,
                message: "tag lost".into()
            }
            .to_string(),
            "Failed to write to tag after 3 attempt(s): tag lost"
        );
    }

    #[test]
    fn test_operation_failed_wraps_message() {
        let error = Error::operation_failed("lock tag", "transceive error");
        assert_eq!(error.to_string(), "Failed to lock tag: transceive error");
        assert!(!error.is_definitive());
    }

    #[test]
    fn test_definitive_classification() {
        assert!(Error::IncorrectPassword.is_definitive());
        assert!(Error::ReadOnlyTag.is_definitive());
        assert!(Error::capacity_exceeded(10, 5).is_definitive());
        assert!(
            !Error::WriteFailed {
                attempts: 1,
                message: String::new()
            }
            .is_definitive()
        );
        assert!(
            !Error::SimulatedFailure {
                operation: "read".into()
            }
            .is_definitive()
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: Error = err.into();
        assert!(matches!(error, Error::InvalidPayload(_)));
    }
}
