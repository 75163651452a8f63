//! Minimal Move type-tag model.
//!
//! Only the shapes needed for dynamic-field key types are supported:
//! primitives, `vector<T>`, and struct tags with type parameters. The
//! variant order matches the on-chain `TypeTag` enum so BCS serialization
//! produces the exact bytes the chain hashes during dynamic-field id
//! derivation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::object_id::ObjectId;

#[derive(Debug, Error)]
#[error("invalid type tag '{0}'")]
pub struct ParseTypeTagError(pub String);

/// A Move type tag. Variant order is load-bearing for BCS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeTag {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Signer,
    Vector(Box<TypeTag>),
    Struct(Box<StructTag>),
    U16,
    U32,
    U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructTag {
    pub address: ObjectId,
    pub module: String,
    pub name: String,
    pub type_params: Vec<TypeTag>,
}

impl TypeTag {
    /// `vector<u8>`, the key type of the routes dynamic field.
    pub fn vector_u8() -> Self {
        TypeTag::Vector(Box::new(TypeTag::U8))
    }

    /// Parse a type-tag string such as `0x2::coin::Coin<0x2::sui::SUI>`.
    pub fn parse(s: &str) -> Result<Self, ParseTypeTagError> {
        let s = s.trim();
        match s {
            "bool" => return Ok(TypeTag::Bool),
            "u8" => return Ok(TypeTag::U8),
            "u16" => return Ok(TypeTag::U16),
            "u32" => return Ok(TypeTag::U32),
            "u64" => return Ok(TypeTag::U64),
            "u128" => return Ok(TypeTag::U128),
            "u256" => return Ok(TypeTag::U256),
            "address" => return Ok(TypeTag::Address),
            "signer" => return Ok(TypeTag::Signer),
            _ => {}
        }
        if let Some(inner) = s.strip_prefix("vector<").and_then(|r| r.strip_suffix('>')) {
            return Ok(TypeTag::Vector(Box::new(TypeTag::parse(inner)?)));
        }
        Ok(TypeTag::Struct(Box::new(StructTag::parse(s)?)))
    }
}

impl StructTag {
    /// Build a struct tag with no type parameters from its parts.
    pub fn new(address: ObjectId, module: &str, name: &str) -> Self {
        Self {
            address,
            module: module.to_string(),
            name: name.to_string(),
            type_params: Vec::new(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, ParseTypeTagError> {
        let err = || ParseTypeTagError(s.to_string());

        // Split off the generic parameter list, if any.
        let (head, params) = match s.find('<') {
            Some(open) => {
                if !s.ends_with('>') {
                    return Err(err());
                }
                (&s[..open], Some(&s[open + 1..s.len() - 1]))
            }
            None => (s, None),
        };

        let mut parts = head.split("::");
        let address_str = parts.next().ok_or_else(err)?;
        let module = parts.next().ok_or_else(err)?;
        let name = parts.next().ok_or_else(err)?;
        if parts.next().is_some() || module.is_empty() || name.is_empty() {
            return Err(err());
        }
        let address = ObjectId::from_hex_literal(address_str).map_err(|_| err())?;

        let type_params = match params {
            None => Vec::new(),
            Some(list) => split_top_level(list)
                .into_iter()
                .map(|p| TypeTag::parse(p))
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(Self {
            address,
            module: module.to_string(),
            name: name.to_string(),
            type_params,
        })
    }
}

/// Split a comma-separated type-parameter list, ignoring commas nested
/// inside angle brackets.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::U8 => write!(f, "u8"),
            TypeTag::U16 => write!(f, "u16"),
            TypeTag::U32 => write!(f, "u32"),
            TypeTag::U64 => write!(f, "u64"),
            TypeTag::U128 => write!(f, "u128"),
            TypeTag::U256 => write!(f, "u256"),
            TypeTag::Address => write!(f, "address"),
            TypeTag::Signer => write!(f, "signer"),
            TypeTag::Vector(inner) => write!(f, "vector<{}>", inner),
            TypeTag::Struct(tag) => write!(f, "{}", tag),
        }
    }
}

impl fmt::Display for StructTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}::{}",
            self.address.to_hex(),
            self.module,
            self.name
        )?;
        if !self.type_params.is_empty() {
            let params: Vec<String> = self.type_params.iter().map(|t| t.to_string()).collect();
            write!(f, "<{}>", params.join(", "))?;
        }
        Ok(())
    }
}
