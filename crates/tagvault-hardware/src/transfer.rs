//! Helpers for readers driven through blocking system calls.
#![cfg_attr(not(feature = "hardware-pcsc"), allow(dead_code))]

use crate::{HardwareError, Result};
use tagvault_codec::find_message;
use tagvault_core::constants::{FIRST_USER_PAGE, PAGE_SIZE};

/// Run a blocking reader call on the blocking pool.
///
/// The caller's future stays cancellable, so an enclosing
/// `tokio::time::timeout` fires even while the call is still running.
pub(crate) async fn run_blocking<T, F>(call: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| HardwareError::communication(format!("reader task failed: {e}")))?
}

/// Read user memory chunk by chunk, starting at the first user page.
///
/// `read_chunk` returns the bytes starting at a page; each chunk advances the
/// page by its length. Reading stops once `capacity` bytes are in, the NDEF
/// TLV is complete, or the last user page has been passed.
///
/// # Errors
/// `InvalidData` if the reader answers with an empty chunk.
pub(crate) fn read_user_memory(
    capacity: usize,
    mut read_chunk: impl FnMut(u8) -> Result<Vec<u8>>,
) -> Result<Vec<u8>> {
    let end_page = usize::from(FIRST_USER_PAGE) + capacity.div_ceil(PAGE_SIZE);
    let mut memory = Vec::with_capacity(capacity);
    let mut page = usize::from(FIRST_USER_PAGE);

    while memory.len() < capacity && page < end_page {
        let index = u8::try_from(page)
            .map_err(|_| HardwareError::invalid_data(format!("page {page} out of range")))?;
        let chunk = read_chunk(index)?;
        if chunk.is_empty() {
            return Err(HardwareError::invalid_data(format!(
                "empty read at page {page}"
            )));
        }

        page += chunk.len().div_ceil(PAGE_SIZE);
        memory.extend_from_slice(&chunk);

        if matches!(find_message(&memory), Ok(Some(_))) {
            break;
        }
    }

    memory.truncate(capacity);
    Ok(memory)
}
