//! BCS descriptors for on-chain site state.
//!
//! A site object carries its resources as dynamic fields keyed by
//! `ResourcePath`; each field's value is a [`Resource`] describing one
//! served path. A second, fixed dynamic field keyed by the byte string
//! `b"routes"` under `vector<u8>` carries the site's routes table.

use serde::{Deserialize, Serialize};

use crate::dynamic_field::Field;
use crate::encoding::{base64_encode, base64_url_encode};
use crate::object_id::ObjectId;

/// An unsigned 256-bit value as it serializes on chain: 32 little-endian
/// bytes. `blob_id` and `blob_hash` both use this representation but encode
/// differently off chain, see the methods below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct U256Le(pub [u8; 32]);

impl U256Le {
    pub fn from_le_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_be_bytes(mut bytes: [u8; 32]) -> Self {
        bytes.reverse();
        Self(bytes)
    }

    pub fn to_le_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn to_be_bytes(self) -> [u8; 32] {
        let mut bytes = self.0;
        bytes.reverse();
        bytes
    }

    /// The URL form of a blob id: URL-safe unpadded Base64 of the
    /// little-endian bytes.
    pub fn to_url_base64(self) -> String {
        base64_url_encode(&self.0)
    }

    /// The comparison form of a blob hash: standard padded Base64 of the
    /// big-endian bytes, equal to `base64(sha256(payload))` for an intact
    /// payload.
    pub fn to_standard_base64_be(self) -> String {
        base64_encode(&self.to_be_bytes())
    }
}

/// An on-chain `VecMap<K, V>`: an ordered list of entries. Order is
/// preserved because routes matching tie-breaks on insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VecMap<K, V> {
    pub contents: Vec<VecMapEntry<K, V>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VecMapEntry<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Default for VecMap<K, V> {
    fn default() -> Self {
        Self {
            contents: Vec::new(),
        }
    }
}

impl<K, V> VecMap<K, V> {
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.contents.iter().map(|e| (&e.key, &e.value))
    }
}

impl<V> VecMap<String, V> {
    pub fn get(&self, key: &str) -> Option<&V> {
        self.contents
            .iter()
            .find(|e| e.key == key)
            .map(|e| &e.value)
    }
}

impl<K, V> FromIterator<(K, V)> for VecMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            contents: iter
                .into_iter()
                .map(|(key, value)| VecMapEntry { key, value })
                .collect(),
        }
    }
}

/// Dynamic-field key for a site resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePath {
    pub path: String,
}

/// Optional byte range stored on a resource, forwarded to the aggregator
/// as an HTTP `Range` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl Range {
    /// Render as an HTTP `Range` header value, or `None` when both bounds
    /// are absent.
    pub fn to_header_value(&self) -> Option<String> {
        match (self.start, self.end) {
            (None, None) => None,
            (Some(start), None) => Some(format!("bytes={}-", start)),
            (None, Some(end)) => Some(format!("bytes=-{}", end)),
            (Some(start), Some(end)) => Some(format!("bytes={}-{}", start, end)),
        }
    }
}

/// The on-chain descriptor of one served path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub path: String,
    pub headers: VecMap<String, String>,
    pub blob_id: U256Le,
    pub blob_hash: U256Le,
    pub range: Option<Range>,
}

/// A resource annotated with the chain coordinates it was fetched from.
/// The version participates in cache validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedResource {
    pub resource: Resource,
    pub object_id: ObjectId,
    pub version: String,
}

/// BCS shape of the resource dynamic field.
pub type ResourceField = Field<ResourcePath, Resource>;

/// BCS shape of the routes dynamic field. The key is the literal bytes
/// `b"routes"`.
pub type RoutesData = Field<Vec<u8>, VecMap<String, String>>;

/// Key bytes of the routes dynamic field, pre-BCS.
pub const ROUTES_FIELD_KEY: &[u8] = b"routes";
