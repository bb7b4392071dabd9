//! Protocol-level constants for tag content and tag protection.
//!
//! # Page layout
//!
//! Page-addressable tags (NTAG21x, Ultralight EV1) expose memory as 4-byte
//! pages. User memory starts at page 4; the last four pages of the chip hold
//! the protection configuration:
//!
//! ```text
//! CFG0  [MIRROR, RFUI, MIRROR_PAGE, AUTH0]
//! CFG1  [ACCESS, RFUI, RFUI, RFUI]          ACCESS bit 7 = PROT
//! PWD   [PWD0, PWD1, PWD2, PWD3]             write-only, reads as zeros
//! PACK  [PACK0, PACK1, RFUI, RFUI]
//! ```
//!
//! Protection covers every page from AUTH0 onward. `AUTH0 = 0xFF` disables
//! it. With PROT clear only writes are gated; with PROT set reads are gated
//! too.
//!
//! # NDEF framing
//!
//! Tag content is a single NDEF text record inside an NDEF message TLV:
//!
//! ```text
//! 0x03 LEN [record...] 0xFE
//! ```

// ============================================================================
// Passwords
// ============================================================================

/// Minimum password length accepted by `lock_tag`.
pub const MIN_PASSWORD_LENGTH: usize = 4;

/// Length of the hardware password written to the PWD page.
pub const PASSWORD_BYTES: usize = 4;

// ============================================================================
// Page-addressable tags
// ============================================================================

/// Size of one memory page in bytes.
pub const PAGE_SIZE: usize = 4;

/// First page of user memory on NTAG21x / Ultralight tags.
pub const FIRST_USER_PAGE: u8 = 4;

/// Capability container page.
pub const CAPABILITY_CONTAINER_PAGE: u8 = 3;

/// AUTH0 value that disables password protection.
pub const AUTH0_DISABLED: u8 = 0xFF;

/// Index of the AUTH0 byte inside the CFG0 page.
pub const AUTH0_BYTE: usize = 3;

/// PROT bit inside the ACCESS byte (CFG1 byte 0).
pub const PROT_BIT: u8 = 0x80;

/// Acknowledgement pattern written to the PACK page.
///
/// Only the first two bytes are returned by a successful PWD_AUTH.
pub const PACK_PATTERN: [u8; PAGE_SIZE] = [0x54, 0x56, 0x00, 0x00];

// ============================================================================
// NDEF
// ============================================================================

/// TLV tag of an NDEF message.
pub const TLV_NDEF_MESSAGE: u8 = 0x03;

/// TLV tag of the terminator.
pub const TLV_TERMINATOR: u8 = 0xFE;

/// TLV tag of a NULL block (padding).
pub const TLV_NULL: u8 = 0x00;

/// TLV tag of a lock control block.
pub const TLV_LOCK_CONTROL: u8 = 0x01;

/// TLV tag of a memory control block.
pub const TLV_MEMORY_CONTROL: u8 = 0x02;

/// Language code written into text records.
pub const NDEF_LANGUAGE: &str = "en";

// ============================================================================
// Lock envelope
// ============================================================================

/// Hint stored in every lock envelope.
pub const LOCK_HINT: &str = "This tag is password protected. Unlock it in the app to read its content.";

// ============================================================================
// Timing
// ============================================================================

/// Default number of write attempts on platforms with flaky write completion.
pub const DEFAULT_WRITE_ATTEMPTS: u32 = 3;

/// Default fixed backoff between write attempts in milliseconds.
pub const DEFAULT_WRITE_BACKOFF_MS: u64 = 500;

/// Tag discovery timeout on Android in milliseconds.
pub const ANDROID_DISCOVERY_TIMEOUT_MS: u64 = 10_000;

/// Tag discovery timeout on iOS in milliseconds.
///
/// Core NFC sessions take noticeably longer to come up.
pub const IOS_DISCOVERY_TIMEOUT_MS: u64 = 20_000;

/// Default simulated scan latency in milliseconds.
pub const DEFAULT_SIMULATOR_DELAY_MS: u64 = 800;
