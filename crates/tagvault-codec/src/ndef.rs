//! NDEF text records and TLV framing.
//!
//! A tag holds exactly one NDEF message with one well-known text record:
//!
//! ```text
//! TLV:     0x03 LEN(1 or 0xFF+2) [record] 0xFE
//! record:  HEADER TYPE_LEN PAYLOAD_LEN(1 or 4) 'T' [payload]
//! payload: STATUS LANG... TEXT...
//! ```
//!
//! `HEADER` carries MB/ME/CF/SR/IL flags and the TNF. `STATUS` bit 7 selects
//! UTF-16 text, bits 0-5 hold the language code length.

use bytes::{BufMut, BytesMut};
use tagvault_core::constants::{
    NDEF_LANGUAGE, TLV_NDEF_MESSAGE, TLV_NULL, TLV_TERMINATOR,
};
use tagvault_core::{Error, Result};

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;
const TNF_WELL_KNOWN: u8 = 0x01;
const TEXT_TYPE: &[u8] = b"T";

const STATUS_UTF16: u8 = 0x80;
const LANGUAGE_MASK: u8 = 0x3F;

/// TLV lengths at or above this value use the 3-byte form.
const TLV_LONG_LENGTH: u8 = 0xFF;

/// Text encoding of a text record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16,
}

/// A decoded NDEF text record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord {
    pub language: String,
    pub encoding: TextEncoding,
    pub text: String,
}

/// Encode a single UTF-8 text record (MB and ME set).
pub fn encode_text_record(text: &str) -> Vec<u8> {
    let language = NDEF_LANGUAGE.as_bytes();
    let payload_len = 1 + language.len() + text.len();
    let short = payload_len <= u8::MAX as usize;

    let mut buf = BytesMut::with_capacity(payload_len + 7);
    let mut header = FLAG_MB | FLAG_ME | TNF_WELL_KNOWN;
    if short {
        header |= FLAG_SR;
    }

    buf.put_u8(header);
    buf.put_u8(TEXT_TYPE.len() as u8);
    if short {
        buf.put_u8(payload_len as u8);
    } else {
        buf.put_u32(payload_len as u32);
    }
    buf.put_slice(TEXT_TYPE);
    buf.put_u8(language.len() as u8 & LANGUAGE_MASK);
    buf.put_slice(language);
    buf.put_slice(text.as_bytes());

    buf.to_vec()
}

/// Decode the first record of an NDEF message as a text record.
///
/// # Errors
/// Returns `Error::InvalidNdef` if the record is truncated, chunked, or not a
/// well-known text record.
pub fn decode_text_record(message: &[u8]) -> Result<TextRecord> {
    let mut reader = Reader::new(message);

    let header = reader.u8()?;
    if header & FLAG_CF != 0 {
        return Err(Error::InvalidNdef(
            "chunked records are not supported".to_string(),
        ));
    }

    let type_len = reader.u8()? as usize;
    let payload_len = if header & FLAG_SR != 0 {
        reader.u8()? as usize
    } else {
        reader.u32()? as usize
    };
    let id_len = if header & FLAG_IL != 0 {
        reader.u8()? as usize
    } else {
        0
    };

    let record_type = reader.take(type_len)?;
    reader.take(id_len)?;
    let payload = reader.take(payload_len)?;

    if header & TNF_MASK != TNF_WELL_KNOWN || record_type != TEXT_TYPE {
        return Err(Error::InvalidNdef("record is not a text record".to_string()));
    }

    decode_text_payload(payload)
}

fn decode_text_payload(payload: &[u8]) -> Result<TextRecord> {
    let mut reader = Reader::new(payload);
    let status = reader.u8()?;
    let language_len = (status & LANGUAGE_MASK) as usize;
    let language = String::from_utf8_lossy(reader.take(language_len)?).into_owned();
    let text_bytes = reader.rest();

    let (encoding, text) = if status & STATUS_UTF16 != 0 {
        (TextEncoding::Utf16, decode_utf16(text_bytes)?)
    } else {
        let text = String::from_utf8(text_bytes.to_vec())
            .map_err(|_| Error::InvalidNdef("text is not valid UTF-8".to_string()))?;
        (TextEncoding::Utf8, text)
    };

    Ok(TextRecord {
        language,
        encoding,
        text,
    })
}

fn decode_utf16(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::InvalidNdef("odd UTF-16 text length".to_string()));
    }

    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    // A byte-swapped BOM means the text was written little-endian.
    match units.first() {
        Some(0xFEFF) => {
            units.remove(0);
        }
        Some(0xFFFE) => {
            units.remove(0);
            units.iter_mut().for_each(|unit| *unit = unit.swap_bytes());
        }
        _ => {}
    }

    String::from_utf16(&units)
        .map_err(|_| Error::InvalidNdef("text is not valid UTF-16".to_string()))
}

/// Wrap an NDEF message in an NDEF message TLV followed by a terminator.
///
/// # Errors
/// Returns `Error::InvalidNdef` if the message does not fit a 3-byte TLV
/// length.
pub fn wrap_tlv(message: &[u8]) -> Result<Vec<u8>> {
    let len = message.len();
    let mut buf = BytesMut::with_capacity(len + 5);

    buf.put_u8(TLV_NDEF_MESSAGE);
    if len < TLV_LONG_LENGTH as usize {
        buf.put_u8(len as u8);
    } else {
        let len = u16::try_from(len).map_err(|_| {
            Error::InvalidNdef(format!("message of {len} bytes exceeds TLV length"))
        })?;
        buf.put_u8(TLV_LONG_LENGTH);
        buf.put_u16(len);
    }
    buf.put_slice(message);
    buf.put_u8(TLV_TERMINATOR);

    Ok(buf.to_vec())
}

/// Encode text as the complete byte image written to tag user memory.
///
/// # Errors
/// See [`wrap_tlv`].
pub fn encode_message(text: &str) -> Result<Vec<u8>> {
    wrap_tlv(&encode_text_record(text))
}

/// Number of bytes [`encode_message`] produces for `text`.
pub fn encoded_message_len(text: &str) -> usize {
    let payload_len = 1 + NDEF_LANGUAGE.len() + text.len();
    let payload_len_field = if payload_len <= u8::MAX as usize { 1 } else { 4 };
    let record_len = 2 + payload_len_field + TEXT_TYPE.len() + payload_len;
    let tlv_len_field = if record_len < TLV_LONG_LENGTH as usize {
        1
    } else {
        3
    };
    1 + tlv_len_field + record_len + 1
}

/// Locate the NDEF message TLV in tag memory.
///
/// NULL TLVs are skipped, lock/memory control TLVs are stepped over, and a
/// terminator (or the end of memory) before any NDEF TLV means there is no
/// message.
///
/// # Errors
/// Returns `Error::InvalidNdef` if a TLV length runs past the end of memory.
pub fn find_message(memory: &[u8]) -> Result<Option<&[u8]>> {
    let mut reader = Reader::new(memory);

    while let Some(tag) = reader.next() {
        match tag {
            TLV_NULL => continue,
            TLV_TERMINATOR => return Ok(None),
            _ => {
                let len = reader.tlv_length()?;
                let value = reader.take(len)?;
                if tag == TLV_NDEF_MESSAGE {
                    return Ok(Some(value));
                }
            }
        }
    }

    Ok(None)
}

/// Decode the text stored in tag memory.
///
/// Returns `Ok(None)` for blank memory, an empty NDEF message, or an empty
/// text record.
///
/// # Errors
/// Returns `Error::InvalidNdef` for malformed framing or a non-text record.
pub fn decode_message(memory: &[u8]) -> Result<Option<String>> {
    let Some(message) = find_message(memory)? else {
        return Ok(None);
    };
    if message.is_empty() {
        return Ok(None);
    }

    let record = decode_text_record(message)?;
    if record.text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(record.text))
    }
}

/// Bounds-checked cursor over a byte slice.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn next(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }

    fn u8(&mut self) -> Result<u8> {
        self.next().ok_or_else(truncated)
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn tlv_length(&mut self) -> Result<usize> {
        let first = self.u8()?;
        if first == TLV_LONG_LENGTH {
            let bytes = self.take(2)?;
            Ok(u16::from_be_bytes([bytes[0], bytes[1]]) as usize)
        } else {
            Ok(first as usize)
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or_else(truncated)?;
        let slice = self.data.get(self.pos..end).ok_or_else(truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos.min(self.data.len())..];
        self.pos = self.data.len();
        slice
    }
}

fn truncated() -> Error {
    Error::InvalidNdef("data truncated".to_string())
}
