//! 32-byte Sui object identifiers.
//!
//! Object ids appear in many formats across the RPC surface:
//! - Short form: "0x2"
//! - Full form: "0x0000000000000000000000000000000000000000000000000000000000000002"
//! - Without prefix: "2"
//!
//! [`ObjectId`] normalizes them all to the full lowercase form and keeps the
//! raw bytes available for hashing and BCS. The serde representation depends
//! on the format: hex strings for human-readable serializers (JSON), the raw
//! 32 bytes for BCS.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Byte length of an object id.
pub const OBJECT_ID_LENGTH: usize = 32;

#[derive(Debug, Error)]
#[error("invalid object id '{0}'")]
pub struct ParseObjectIdError(pub String);

/// A 32-byte Sui object identifier (also used for addresses; the two share
/// one representation on chain).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LENGTH]);

impl ObjectId {
    pub const ZERO: ObjectId = ObjectId([0u8; OBJECT_ID_LENGTH]);

    pub const fn new(bytes: [u8; OBJECT_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LENGTH] {
        &self.0
    }

    pub fn into_bytes(self) -> [u8; OBJECT_ID_LENGTH] {
        self.0
    }

    /// Parse a hex string in short or full form, with or without `0x`.
    ///
    /// # Examples
    ///
    /// ```
    /// use portal_types::ObjectId;
    ///
    /// let id = ObjectId::from_hex_literal("0x2").unwrap();
    /// assert_eq!(
    ///     id.to_hex(),
    ///     "0x0000000000000000000000000000000000000000000000000000000000000002"
    /// );
    /// ```
    pub fn from_hex_literal(s: &str) -> Result<Self, ParseObjectIdError> {
        let s = s.trim();
        let hex_part = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if hex_part.is_empty() || hex_part.len() > OBJECT_ID_LENGTH * 2 {
            return Err(ParseObjectIdError(s.to_string()));
        }
        // Left-pad odd/short forms to the full 64 hex characters.
        let padded = format!("{:0>64}", hex_part.to_lowercase());
        let raw = hex::decode(&padded).map_err(|_| ParseObjectIdError(s.to_string()))?;
        let mut bytes = [0u8; OBJECT_ID_LENGTH];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseObjectIdError> {
        if bytes.len() != OBJECT_ID_LENGTH {
            return Err(ParseObjectIdError(hex::encode(bytes)));
        }
        let mut out = [0u8; OBJECT_ID_LENGTH];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Full-form hex representation (`0x` + 64 lowercase hex characters).
    ///
    /// This is the canonical format for internal comparisons and logging.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Short-form hex with leading zeros trimmed (`0x2` instead of
    /// `0x0000...0002`). Display-only.
    pub fn to_hex_short(&self) -> String {
        let hex = hex::encode(self.0);
        let trimmed = hex.trim_start_matches('0');
        if trimmed.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{}", trimmed)
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex_short())
    }
}

impl FromStr for ObjectId {
    type Err = ParseObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex_literal(s)
    }
}

impl AsRef<[u8]> for ObjectId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            // BCS: a fixed 32-byte sequence with no length prefix.
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_hex_literal(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <[u8; OBJECT_ID_LENGTH]>::deserialize(deserializer)?;
            Ok(Self(bytes))
        }
    }
}
