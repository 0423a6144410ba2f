//! Binary keymap format.
//!
//! ```text
//! [0..2]  magic 0xA5 0xA5
//! [2]     format version
//! [3..5]  entry count N, little-endian
//! [5..]   N entries of (code: u8, modifiers: u8)
//! ```
//!
//! Modifier bits travel in the high nibble of the second entry byte, the low
//! nibble is reserved and written as zero. Labels are not part of the binary
//! form.

use super::{KeyEntry, Keymap, Modifiers};
use crate::error::{CodecError, DecodeError, DecodeReason, EncodeError, FormatError};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Serialize;

pub const MAGIC: u16 = 0xA5A5;
pub const HEADER_LEN: usize = 5;
pub const ENTRY_LEN: usize = 2;
const MODS_SHIFT: u8 = 4;

pub fn encode(keymap: &Keymap) -> Result<Vec<u8>, EncodeError> {
    let count = u16::try_from(keymap.keys.len())
        .map_err(|_| EncodeError::TooManyKeys(keymap.keys.len()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + ENTRY_LEN * keymap.keys.len());
    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.push(keymap.version);
    out.extend_from_slice(&count.to_le_bytes());

    for (index, key) in keymap.keys.iter().enumerate() {
        let code = u8::try_from(key.code).map_err(|_| EncodeError::CodeOutOfRange {
            index,
            code: key.code,
        })?;
        if !key.mods.is_valid() {
            return Err(EncodeError::ModifiersOutOfRange {
                index,
                mods: key.mods.bits(),
            });
        }
        out.push(code);
        out.push((key.mods.bits() as u8) << MODS_SHIFT);
    }

    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<Keymap, DecodeError> {
    let header = bytes
        .get(..HEADER_LEN)
        .ok_or(DecodeError::new(DecodeReason::Truncated))?;

    if u16::from_le_bytes([header[0], header[1]]) != MAGIC {
        return Err(DecodeError::new(DecodeReason::BadMagic));
    }
    let version = header[2];
    let count = u16::from_le_bytes([header[3], header[4]]) as usize;

    let body = &bytes[HEADER_LEN..];
    let expected = ENTRY_LEN * count;
    if body.len() < expected {
        return Err(DecodeError::new(DecodeReason::Truncated));
    }
    if body.len() > expected {
        return Err(DecodeError::new(DecodeReason::CountMismatch));
    }

    let keys = body
        .chunks_exact(ENTRY_LEN)
        .map(|pair| {
            KeyEntry::new(
                pair[0],
                Modifiers::from_bits_retain((pair[1] >> MODS_SHIFT) as u16),
            )
        })
        .collect();

    Ok(Keymap { version, keys })
}

pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Accepts either case and ignores whitespace between byte pairs.
pub fn from_hex(text: &str) -> Result<Vec<u8>, FormatError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(compact).map_err(|e| FormatError::InvalidHex(e.to_string()))
}

pub fn to_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn from_base64(text: &str) -> Result<Vec<u8>, FormatError> {
    BASE64
        .decode(text.trim())
        .map_err(|e| FormatError::InvalidBase64(e.to_string()))
}

pub fn keymap_to_hex(keymap: &Keymap) -> Result<String, CodecError> {
    Ok(to_hex(&encode(keymap)?))
}

pub fn keymap_to_base64(keymap: &Keymap) -> Result<String, CodecError> {
    Ok(to_base64(&encode(keymap)?))
}

pub fn keymap_from_hex(text: &str) -> Result<Keymap, CodecError> {
    Ok(decode(&from_hex(text)?)?)
}

pub fn keymap_from_base64(text: &str) -> Result<Keymap, CodecError> {
    Ok(decode(&from_base64(text)?)?)
}

/// Header facts about a buffer, readable even when it would not decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinaryInfo {
    pub magic: u16,
    pub magic_valid: bool,
    pub version: u8,
    pub key_count: usize,
    pub total_size: usize,
    pub expected_size: usize,
    pub size_valid: bool,
}

pub fn binary_info(bytes: &[u8]) -> Option<BinaryInfo> {
    let header = bytes.get(..HEADER_LEN)?;
    let magic = u16::from_le_bytes([header[0], header[1]]);
    let key_count = u16::from_le_bytes([header[3], header[4]]) as usize;
    let expected_size = HEADER_LEN + ENTRY_LEN * key_count;

    Some(BinaryInfo {
        magic,
        magic_valid: magic == MAGIC,
        version: header[2],
        key_count,
        total_size: bytes.len(),
        expected_size,
        size_valid: bytes.len() == expected_size,
    })
}
