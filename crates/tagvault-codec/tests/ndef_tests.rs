//! Integration tests for the tag memory image: payload text through NDEF and
//! TLV framing, and the software lock envelope stored the same way.

use rstest::rstest;
use serde_json::json;
use tagvault_codec::{
    LockEnvelope, decode_message, encode_message, encoded_message_len, ensure_capacity,
    find_message, from_tag_text, to_tag_text,
};
use tagvault_core::{Error, Password};

/// Lay an encoded message into zero-filled user memory of `size` bytes.
fn tag_memory(text: &str, size: usize) -> Vec<u8> {
    let mut memory = encode_message(text).unwrap();
    assert!(memory.len() <= size, "fixture does not fit");
    memory.resize(size, 0);
    memory
}

#[rstest]
#[case::ntag213(json!({"id": 7}), 144)]
#[case::ntag215(json!({"device": "sensor-1", "location": "Lobby", "floor": 0}), 504)]
#[case::ntag216(json!(["a", "b", "c"]), 888)]
fn test_payload_survives_tag_memory(#[case] payload: serde_json::Value, #[case] size: usize) {
    let text = to_tag_text(&payload).unwrap();
    let memory = tag_memory(&text, size);

    let read = decode_message(&memory).unwrap().unwrap();
    assert_eq!(from_tag_text(&read), payload);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(250)]
#[case(251)]
#[case(252)]
#[case(600)]
fn test_encoded_len_matches_encoder(#[case] text_len: usize) {
    let text = "z".repeat(text_len);
    assert_eq!(encode_message(&text).unwrap().len(), encoded_message_len(&text));
}

#[test]
fn test_multibyte_text_is_counted_in_bytes() {
    let text = "ação";
    assert_eq!(text.len(), 6);
    assert_eq!(encoded_message_len(text), encode_message(text).unwrap().len());

    let memory = tag_memory(text, 48);
    assert_eq!(decode_message(&memory).unwrap().as_deref(), Some(text));
}

#[test]
fn test_message_after_memory_control_tlv() {
    // Memory control TLV as found on some factory-formatted tags
    let mut memory = vec![0x02, 0x03, 0x3F, 0x0C, 0x34];
    memory.extend(encode_message("hello").unwrap());

    let message = find_message(&memory).unwrap().unwrap();
    assert_eq!(message[0], 0xD1);
    assert_eq!(decode_message(&memory).unwrap().as_deref(), Some("hello"));
}

#[test]
fn test_terminator_before_message_means_blank() {
    let mut memory = vec![0xFE];
    memory.extend(encode_message("hidden").unwrap());
    assert_eq!(decode_message(&memory).unwrap(), None);
}

#[test]
fn test_envelope_in_tag_memory() {
    let password = Password::for_lock("secret").unwrap();
    let original = to_tag_text(&json!({"a": 1})).unwrap();

    let sealed = LockEnvelope::seal(Some(&original), &password).to_json().unwrap();
    let memory = tag_memory(&sealed, 504);

    let read = decode_message(&memory).unwrap().unwrap();
    let envelope = LockEnvelope::parse(&read).unwrap();
    assert!(envelope.has_content);

    let restored = envelope.open(&password).unwrap().unwrap();
    assert_eq!(from_tag_text(&restored), json!({"a": 1}));

    let wrong = Password::for_unlock("wrong!").unwrap();
    assert_eq!(envelope.open(&wrong).unwrap_err(), Error::IncorrectPassword);
}

#[test]
fn test_capacity_boundary_on_payload_bytes() {
    let text = to_tag_text(&json!({"k": "v"})).unwrap();
    let size = text.len();

    assert!(ensure_capacity(size, Some(size)).is_ok());
    assert_eq!(
        ensure_capacity(size + 1, Some(size)).unwrap_err(),
        Error::capacity_exceeded(size + 1, size)
    );
}
