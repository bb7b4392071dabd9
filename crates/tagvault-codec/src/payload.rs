//! Conversion between application payloads and tag text.

use serde::Serialize;
use serde_json::Value;
use tagvault_core::{Error, Result};

/// Serialize a payload to the compact JSON text stored on a tag.
///
/// # Errors
/// Returns `Error::InvalidPayload` if the payload cannot be serialized.
pub fn to_tag_text<T: Serialize + ?Sized>(payload: &T) -> Result<String> {
    Ok(serde_json::to_string(payload)?)
}

/// Parse text read from a tag.
///
/// Text that is not JSON (written by another app, say) is returned as a JSON
/// string rather than rejected.
pub fn from_tag_text(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Check a serialized size against a tag capacity.
///
/// An unknown capacity accepts any size.
///
/// # Errors
/// Returns `Error::CapacityExceeded` when `size > capacity`.
pub fn ensure_capacity(size: usize, capacity: Option<usize>) -> Result<()> {
    match capacity {
        Some(capacity) if size > capacity => Err(Error::capacity_exceeded(size, capacity)),
        _ => Ok(()),
    }
}
