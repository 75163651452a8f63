//! Shared test infrastructure for the end-to-end portal tests.
//!
//! The seams mocked here are the same traits production implements:
//! [`portal_rpc::RpcTransport`] for the chain and
//! [`portal_core::Aggregator`] for blob storage. Everything in between is
//! the real pipeline.

// Each integration test binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

pub mod chain;
pub mod setup;

#[allow(unused_imports)]
pub use chain::{MockAggregator, MockChain};
#[allow(unused_imports)]
pub use setup::TestPortalBuilder;
