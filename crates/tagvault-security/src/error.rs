//! Mapping from radio-level failures to user-facing errors.

use tagvault_core::Error;
use tagvault_hardware::HardwareError;

/// Translate a [`HardwareError`] raised while performing `operation`.
///
/// Conditions with a dedicated user-facing message keep it; everything else
/// becomes `Error::OperationFailed` carrying the underlying reason.
pub fn map_hardware_error(operation: &str, err: HardwareError) -> Error {
    match err {
        HardwareError::Timeout { .. } => Error::TagNotPresent,
        HardwareError::Unavailable { .. } => Error::HardwareUnavailable,
        HardwareError::Cancelled => Error::OperationCancelled,
        HardwareError::ReadOnly => Error::ReadOnlyTag,
        HardwareError::CapacityExceeded { size, capacity } => {
            Error::capacity_exceeded(size, capacity)
        }
        HardwareError::AuthenticationRequired { .. } => Error::TagLocked,
        HardwareError::AuthenticationFailed => Error::IncorrectPassword,
        other => Error::operation_failed(operation, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HardwareError::timeout(10_000), Error::TagNotPresent)]
    #[case(HardwareError::unavailable("NFC is off"), Error::HardwareUnavailable)]
    #[case(HardwareError::Cancelled, Error::OperationCancelled)]
    #[case(HardwareError::ReadOnly, Error::ReadOnlyTag)]
    #[case(HardwareError::capacity_exceeded(600, 504), Error::capacity_exceeded(600, 504))]
    #[case(HardwareError::authentication_required(4), Error::TagLocked)]
    #[case(HardwareError::AuthenticationFailed, Error::IncorrectPassword)]
    fn test_dedicated_messages(#[case] err: HardwareError, #[case] expected: Error) {
        assert_eq!(map_hardware_error("read tag", err), expected);
    }

    #[test]
    fn test_other_errors_keep_reason() {
        let err = map_hardware_error("write tag", HardwareError::communication("tag lost"));
        assert!(matches!(err, Error::OperationFailed { .. }));
        assert!(err.to_string().starts_with("Failed to write tag: "));
        assert!(err.to_string().contains("tag lost"));
        assert!(!err.is_definitive());
    }
}
