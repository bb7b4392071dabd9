//! Error types for tag access operations.
//!
//! These errors describe what went wrong at the radio/reader level. The
//! security layer maps them onto the user-facing `tagvault_core::Error`.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while talking to a tag.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// No tag was discovered before the deadline.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The tag or reader does not support this technology or command.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Transport-level failure (tag moved away, reader glitch).
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Malformed data from the tag or reader.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// An operation was attempted without claiming the radio first.
    #[error("Radio not claimed for {profile}")]
    NotClaimed { profile: String },

    /// NFC is disabled or no reader is attached.
    #[error("NFC hardware unavailable: {message}")]
    Unavailable { message: String },

    /// The user dismissed the scan session.
    #[error("Session cancelled")]
    Cancelled,

    /// PWD_AUTH was answered with a NAK.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Access to a protected page without prior authentication.
    #[error("Authentication required for page {page}")]
    AuthenticationRequired { page: u8 },

    /// The tag is permanently read-only.
    #[error("Tag is read-only")]
    ReadOnly,

    /// Content does not fit the tag.
    #[error("Content of {size} bytes exceeds capacity of {capacity} bytes")]
    CapacityExceeded { size: usize, capacity: usize },

    /// A write was attempted but not confirmed.
    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn not_claimed(profile: impl ToString) -> Self {
        Self::NotClaimed {
            profile: profile.to_string(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn authentication_required(page: u8) -> Self {
        Self::AuthenticationRequired { page }
    }

    pub fn capacity_exceeded(size: usize, capacity: usize) -> Self {
        Self::CapacityExceeded { size, capacity }
    }

    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<tagvault_core::Error> for HardwareError {
    fn from(err: tagvault_core::Error) -> Self {
        Self::InvalidData {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error() {
        let error = HardwareError::timeout(10_000);
        assert!(matches!(error, HardwareError::Timeout { .. }));
        assert_eq!(error.to_string(), "Operation timeout after 10000ms");
    }

    #[test]
    fn test_unsupported_error() {
        let error = HardwareError::unsupported("PWD_AUTH");
        assert_eq!(error.to_string(), "Unsupported operation: PWD_AUTH");
    }

    #[test]
    fn test_authentication_required_error() {
        let error = HardwareError::authentication_required(4);
        assert_eq!(error.to_string(), "Authentication required for page 4");
    }

    #[test]
    fn test_from_codec_error() {
        let error: HardwareError = tagvault_core::Error::InvalidNdef("data truncated".into()).into();
        assert!(matches!(error, HardwareError::InvalidData { .. }));
        assert_eq!(
            error.to_string(),
            "Invalid data: Invalid NDEF data: data truncated"
        );
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            HardwareError::communication("tag lost"),
            HardwareError::unavailable("NFC disabled"),
            HardwareError::Cancelled,
            HardwareError::AuthenticationFailed,
            HardwareError::capacity_exceeded(600, 504),
        ];

        for error in errors {
            let _ = format!("{}", error);
            let _ = format!("{:?}", error);
        }
    }
}
