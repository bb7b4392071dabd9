//! Reversible XOR stream cipher used by software locks.
//!
//! # Security
//! This is obfuscation, not encryption. The keystream is the password
//! repeated, so anyone holding the tag and a guess of the content can recover
//! the password. Hardware locks should be preferred wherever the chip
//! supports them.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use tagvault_core::{Error, Password, Result};

/// XOR `data` with `key` repeated to its length.
///
/// Applying the same key twice returns the input. An empty key leaves the
/// data unchanged.
pub fn xor_stream(data: &[u8], key: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        return data.to_vec();
    }

    data.iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

/// Encrypt text with a password and encode the result as base64.
pub fn encrypt(plaintext: &str, password: &Password) -> String {
    STANDARD.encode(xor_stream(plaintext.as_bytes(), password.as_bytes()))
}

/// Decrypt base64 ciphertext produced by [`encrypt`].
///
/// There is no authentication tag, so a wrong password is detected by
/// checking whether the output looks like text.
///
/// # Errors
/// - `Error::InvalidPayload` if the ciphertext is not base64
/// - `Error::IncorrectPassword` if the output is not plausible text
pub fn decrypt(ciphertext: &str, password: &Password) -> Result<String> {
    let bytes = STANDARD
        .decode(ciphertext.trim())
        .map_err(|_| Error::InvalidPayload("corrupted lock envelope".to_string()))?;

    let plain = xor_stream(&bytes, password.as_bytes());
    let text = String::from_utf8(plain).map_err(|_| Error::IncorrectPassword)?;

    if is_plausible_text(&text) {
        Ok(text)
    } else {
        Err(Error::IncorrectPassword)
    }
}

/// Whether decrypted text looks like real content: no control characters
/// other than tab, newline, and carriage return.
pub fn is_plausible_text(text: &str) -> bool {
    text.chars()
        .all(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password(value: &str) -> Password {
        Password::for_unlock(value).unwrap()
    }

    #[test]
    fn test_xor_stream_is_self_inverse() {
        let data = b"{\"device\":\"sensor-1\"}";
        let once = xor_stream(data, b"key!");
        assert_ne!(once.as_slice(), data.as_slice());
        assert_eq!(xor_stream(&once, b"key!"), data.to_vec());
    }

    #[test]
    fn test_xor_stream_empty_key() {
        assert_eq!(xor_stream(b"abc", b""), b"abc".to_vec());
        assert!(xor_stream(b"", b"key").is_empty());
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let secret = password("secret");
        let ciphertext = encrypt("{\"a\":1}", &secret);
        assert_eq!(decrypt(&ciphertext, &secret).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_decrypt_wrong_password() {
        let ciphertext = encrypt("{\"a\":1}", &password("secret"));
        assert_eq!(
            decrypt(&ciphertext, &password("wrong!")).unwrap_err(),
            Error::IncorrectPassword
        );
    }

    #[test]
    fn test_decrypt_corrupted_ciphertext() {
        assert!(matches!(
            decrypt("not base64!!", &password("1234")).unwrap_err(),
            Error::InvalidPayload(_)
        ));
    }

    #[test]
    fn test_plausible_text() {
        assert!(is_plausible_text("line one\nline two\ttabbed\r\n"));
        assert!(is_plausible_text("ünïcödé"));
        assert!(is_plausible_text(""));
        assert!(!is_plausible_text("abc\u{0}"));
        assert!(!is_plausible_text("\u{7f}"));
    }
}
