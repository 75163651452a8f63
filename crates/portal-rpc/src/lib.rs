//! JSON-RPC transport layer for walrus-portal.
//!
//! This crate provides:
//! - [`transport`]: the [`RpcTransport`] seam and its reqwest-backed
//!   production implementation
//! - [`types`]: the typed slice of the Sui JSON-RPC object model the portal
//!   consumes, plus the response-validity rules
//! - [`selector`]: [`RpcSelector`], which multiplexes several upstream
//!   endpoints with sticky-first routing and race-on-failure fallback
//!
//! # Example
//!
//! ```ignore
//! use portal_rpc::{JsonRpcEndpoint, RpcSelector};
//!
//! let selector = RpcSelector::from_urls(
//!     &["https://fullnode.mainnet.sui.io:443".into()],
//!     std::time::Duration::from_millis(7000),
//! );
//! let response = selector.get_object(&site_id, &Default::default()).await?;
//! ```

pub mod selector;
pub mod transport;
pub mod types;

pub use selector::{RpcSelector, SelectorMetricsSnapshot};
pub use transport::{JsonRpcEndpoint, RpcError, RpcTransport};
pub use types::{DynamicFieldName, ObjectDataOptions, ObjectResponse};
