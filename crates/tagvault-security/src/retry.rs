//! Bounded NDEF write retries.

use crate::config::RetryPolicy;
use crate::error::map_hardware_error;
use crate::session::TagSession;
use tagvault_core::{Error, Result};
use tagvault_hardware::TagAccess;
use tracing::{info, warn};

/// Write `text` to the tag, retrying transient failures under `policy`.
///
/// Definitive failures (read-only, locked, too large) end the loop at once.
///
/// # Errors
/// `Error::WriteFailed` once every attempt has failed.
pub(crate) async fn write_with_retry<A: TagAccess>(
    session: &mut TagSession<'_, A>,
    text: &str,
    policy: &RetryPolicy,
) -> Result<()> {
    let attempts = policy.max_attempts.max(1);
    let mut last_message = String::new();

    for attempt in 1..=attempts {
        match session.write_ndef_text(text).await {
            Ok(()) => {
                if attempt > 1 {
                    info!(attempt, "Tag write succeeded after retry");
                }
                return Ok(());
            }
            Err(err) => {
                last_message = err.to_string();
                let mapped = map_hardware_error("write tag", err);
                if mapped.is_definitive() {
                    return Err(mapped);
                }

                warn!(attempt, max_attempts = attempts, error = %last_message, "Tag write failed");
                if attempt < attempts {
                    tokio::time::sleep(policy.backoff()).await;
                }
            }
        }
    }

    Err(Error::WriteFailed {
        attempts,
        message: last_message,
    })
}
