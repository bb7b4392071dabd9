//! Property-based tests for the content codec.

use proptest::prelude::*;
use tagvault_codec::{
    decode_message, decrypt, encode_message, encoded_message_len, encrypt, xor_stream,
};
use tagvault_core::Password;

/// Passwords accepted by `lock_tag`.
fn valid_password() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9A-Za-z!@#$%]{4,16}")
        .expect("Failed to create password regex strategy")
}

/// Printable content, including the whitespace a JSON payload may carry.
fn printable_text() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~\t\n\r]{0,300}")
        .expect("Failed to create text regex strategy")
}

proptest! {
    /// XOR with the same key twice is the identity for arbitrary bytes.
    #[test]
    fn prop_xor_stream_self_inverse(
        data in prop::collection::vec(any::<u8>(), 0..512),
        key in prop::collection::vec(any::<u8>(), 0..16),
    ) {
        prop_assert_eq!(xor_stream(&xor_stream(&data, &key), &key), data);
    }

    /// Decrypting with the sealing password returns the original text.
    #[test]
    fn prop_encrypt_decrypt_roundtrip(
        text in printable_text(),
        password in valid_password(),
    ) {
        let password = Password::for_lock(&password).unwrap();
        let ciphertext = encrypt(&text, &password);
        prop_assert_eq!(decrypt(&ciphertext, &password).unwrap(), text);
    }

    /// Encoded size is exact and the text reads back unchanged.
    #[test]
    fn prop_ndef_message_roundtrip(text in "\\PC{1,400}") {
        let memory = encode_message(&text).unwrap();
        prop_assert_eq!(memory.len(), encoded_message_len(&text));
        prop_assert_eq!(decode_message(&memory).unwrap(), Some(text));
    }

    /// Arbitrary memory never panics the decoder.
    #[test]
    fn prop_decode_arbitrary_memory(memory in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_message(&memory);
    }
}
