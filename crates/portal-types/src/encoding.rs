//! Encoding helpers used across the workspace.
//!
//! Base64 comes in two flavors here and mixing them up corrupts URLs:
//! blob ids travel as URL-safe unpadded Base64 of the little-endian bytes,
//! while blob hashes compare as standard padded Base64 of the big-endian
//! digest. Base36 is the DNS-label encoding of a 32-byte object id.

use base64::Engine;
use thiserror::Error;

use crate::object_id::{ObjectId, OBJECT_ID_LENGTH};

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("failed to decode {context} from base64: {source}")]
    Base64 {
        context: &'static str,
        source: base64::DecodeError,
    },
    #[error("invalid {context} hex '{value}'")]
    Hex { context: &'static str, value: String },
    #[error("invalid base36 digit '{0}'")]
    Base36Digit(char),
    #[error("base36 value does not fit in 32 bytes")]
    Base36Overflow,
    #[error("empty base36 string")]
    Base36Empty,
}

// =============================================================================
// Base64
// =============================================================================

/// Encode bytes as standard (padded) Base64.
pub fn base64_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode standard Base64, tolerating a missing padding tail.
pub fn base64_decode(encoded: &str, context: &'static str) -> Result<Vec<u8>, EncodingError> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(encoded))
        .map_err(|source| EncodingError::Base64 { context, source })
}

/// Encode bytes as URL-safe unpadded Base64 (the blob-id URL form).
pub fn base64_url_encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode URL-safe Base64 with or without padding.
pub fn base64_url_decode(encoded: &str, context: &'static str) -> Result<Vec<u8>, EncodingError> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(encoded)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(encoded))
        .map_err(|source| EncodingError::Base64 { context, source })
}

// =============================================================================
// Hex
// =============================================================================

/// Parse a hex string (with or without `0x` prefix) to raw bytes.
pub fn parse_hex_bytes(hex_str: &str, context: &'static str) -> Result<Vec<u8>, EncodingError> {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(stripped).map_err(|_| EncodingError::Hex {
        context,
        value: hex_str.to_string(),
    })
}

// =============================================================================
// Base36
// =============================================================================

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Encode a 32-byte object id as a lowercase base36 DNS label.
///
/// The id is treated as a big-endian unsigned integer; leading zero bytes do
/// not produce leading `0` digits, so `encode` of the zero id is `"0"`.
pub fn base36_encode(id: &ObjectId) -> String {
    let mut num = id.as_bytes().to_vec();
    // Digits accumulate least-significant first.
    let mut digits: Vec<u8> = Vec::new();
    loop {
        let mut rem: u32 = 0;
        let mut all_zero = true;
        for byte in num.iter_mut() {
            let v = rem * 256 + *byte as u32;
            *byte = (v / 36) as u8;
            rem = v % 36;
            if *byte != 0 {
                all_zero = false;
            }
        }
        digits.push(BASE36_ALPHABET[rem as usize]);
        if all_zero {
            break;
        }
    }
    digits.iter().rev().map(|&b| b as char).collect()
}

/// Decode a lowercase base36 DNS label into a 32-byte object id.
///
/// Rejects uppercase input; DNS labels reaching the portal are lowercased
/// before resolution, and the encoding is defined over `0-9a-z` only.
pub fn base36_decode(label: &str) -> Result<ObjectId, EncodingError> {
    if label.is_empty() {
        return Err(EncodingError::Base36Empty);
    }
    // Big-endian byte accumulator; grows only when a carry overflows it.
    let mut acc: Vec<u8> = vec![0];
    for c in label.chars() {
        let digit = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'a'..='z' => c as u32 - 'a' as u32 + 10,
            _ => return Err(EncodingError::Base36Digit(c)),
        };
        let mut carry = digit;
        for byte in acc.iter_mut().rev() {
            let v = *byte as u32 * 36 + carry;
            *byte = (v & 0xff) as u8;
            carry = v >> 8;
        }
        while carry > 0 {
            acc.insert(0, (carry & 0xff) as u8);
            carry >>= 8;
        }
        if acc.len() > OBJECT_ID_LENGTH {
            return Err(EncodingError::Base36Overflow);
        }
    }
    let mut bytes = [0u8; OBJECT_ID_LENGTH];
    bytes[OBJECT_ID_LENGTH - acc.len()..].copy_from_slice(&acc);
    Ok(ObjectId::new(bytes))
}
