//! Shared types for the walrus-portal workspace.
//!
//! This crate is the canonical home for the on-chain data model and the
//! encodings the portal speaks:
//!
//! - [`object_id`]: 32-byte Sui object identifiers with normalization
//! - [`encoding`]: hex / Base64 / base36 codecs
//! - [`type_tag`]: the minimal Move type-tag model used for dynamic-field keys
//! - [`dynamic_field`]: local (RPC-free) dynamic-field object-id derivation
//! - [`site`]: BCS descriptors for site resources and routes
//! - [`response`]: the framework-free HTTP response model
//! - [`env_utils`]: typed environment-variable parsing
//!
//! Other crates should import from here rather than defining their own
//! copies of these types.

pub mod dynamic_field;
pub mod encoding;
pub mod env_utils;
pub mod object_id;
pub mod response;
pub mod site;
pub mod type_tag;

pub use dynamic_field::{derive_dynamic_field_id, Field};
pub use object_id::ObjectId;
pub use response::PortalResponse;
pub use site::{Range, Resource, ResourcePath, RoutesData, U256Le, VecMap, VersionedResource};
pub use type_tag::{StructTag, TypeTag};
