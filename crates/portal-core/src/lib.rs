//! Request orchestration for walrus-portal.
//!
//! This crate composes the resolver, resource fetcher, routes engine, blob
//! aggregator, list checkers, and cache into the pipeline one HTTP request
//! flows through:
//!
//! ```text
//! host+path -> links -> lists -> resolver -> fetcher (-> routes -> fetcher)
//!           -> aggregator -> hash verify -> response
//! ```
//!
//! [`service::PortalService`] is the cache-wrapped entry point the HTTP
//! front end calls; [`fetcher::UrlFetcher`] is the uncached pipeline.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod links;
pub mod lists;
pub mod pages;
pub mod service;

pub use aggregator::{
    Aggregator, AggregatorClient, AggregatorMetricsSnapshot, BlobResponse, HttpAggregator,
};
pub use config::{Network, PortalConfig};
pub use error::PortalError;
pub use fetcher::UrlFetcher;
pub use links::DomainDetails;
pub use lists::{KvStoreChecker, ListChecker, StaticListChecker};
pub use service::PortalService;
