//! Content codec for tag payloads.
//!
//! Everything in this crate is pure and synchronous:
//!
//! - [`ndef`]: NDEF text records and the TLV framing stored in tag memory
//! - [`cipher`]: the reversible XOR stream cipher used by software locks
//! - [`envelope`]: the JSON lock envelope written in place of plain content
//! - [`payload`]: conversion between application JSON and tag text
//!
//! ```text
//! JSON payload ──payload──> text ──ndef──> record ──tlv──> tag memory
//!                            │
//!                            └──envelope/cipher (software lock)
//! ```

pub mod cipher;
pub mod envelope;
pub mod ndef;
pub mod payload;

pub use cipher::{decrypt, encrypt, is_plausible_text, xor_stream};
pub use envelope::LockEnvelope;
pub use ndef::{
    TextEncoding, TextRecord, decode_message, decode_text_record, encode_message,
    encode_text_record, encoded_message_len, find_message, wrap_tlv,
};
pub use payload::{ensure_capacity, from_tag_text, to_tag_text};
