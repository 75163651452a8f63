//! The portal's error taxonomy and its translation to HTTP responses.
//!
//! User-visible responses deliberately collapse several distinct causes
//! into the shared 404 page; the distinctions live in the logs. The
//! internal codes 310 (too many redirects) and 508 (loop) are logged and
//! never returned.

use thiserror::Error;
use tracing::warn;

use portal_fetcher::FetchError;
use portal_resolver::ResolveError;
use portal_rpc::transport::RpcError;
use portal_types::{ObjectId, PortalResponse};

use crate::aggregator::AggregatorError;
use crate::pages;

#[derive(Debug, Error)]
pub enum PortalError {
    /// No object id could be derived for the subdomain.
    #[error("could not resolve subdomain '{0}'")]
    Resolution(String),

    /// Every configured RPC endpoint failed or timed out.
    #[error("upstream rpc unavailable")]
    UpstreamUnavailable(#[source] RpcError),

    /// Neither the resource, nor a route match, nor `/404.html` exists.
    #[error("resource not found on site")]
    ResourceNotFound,

    /// Site-level misconfiguration: a redirect chain revisited a site.
    #[error("redirect loop detected at {0}")]
    LoopDetected(ObjectId),

    /// Site-level misconfiguration: too many redirect hops.
    #[error("too many redirects")]
    TooManyRedirects,

    /// The aggregator answered with a non-success status after retries.
    #[error("aggregator responded with status {0}")]
    AggregatorStatus(u16),

    /// The aggregator could not be reached at all.
    #[error("aggregator unreachable")]
    AggregatorUnreachable(#[source] AggregatorError),

    /// The blob's SHA-256 does not match the on-chain record.
    #[error("blob checksum mismatch")]
    ChecksumMismatch,

    /// The resolved site is on the blocklist.
    #[error("site is blocked")]
    Blocked,

    #[error("internal error: {0}")]
    Internal(String),
}

impl PortalError {
    /// Translate to the user-visible response, logging the internal-only
    /// codes on the way.
    pub fn into_response(self) -> PortalResponse {
        match self {
            PortalError::Resolution(subdomain) => {
                warn!(subdomain = %subdomain, "subdomain did not resolve");
                pages::site_not_found()
            }
            PortalError::UpstreamUnavailable(error) => {
                warn!(error = %error, "all rpc endpoints unavailable");
                pages::upstream_unavailable()
            }
            PortalError::ResourceNotFound => pages::site_not_found(),
            PortalError::LoopDetected(site) => {
                warn!(site = %site, internal_status = 508, "redirect loop detected");
                pages::site_not_found()
            }
            PortalError::TooManyRedirects => {
                warn!(internal_status = 310, "redirect chain too long");
                pages::site_not_found()
            }
            PortalError::AggregatorStatus(status) => {
                warn!(status, "aggregator fetch failed");
                if status >= 500 {
                    pages::upstream_unavailable()
                } else {
                    pages::site_not_found()
                }
            }
            PortalError::AggregatorUnreachable(error) => {
                warn!(error = %error, "aggregator unreachable");
                pages::upstream_unavailable()
            }
            PortalError::ChecksumMismatch => pages::hash_mismatch(),
            // Indistinguishable from not-found by design.
            PortalError::Blocked => pages::site_not_found(),
            PortalError::Internal(message) => {
                warn!(message = %message, "unexpected internal error");
                pages::internal_error()
            }
        }
    }
}

impl From<ResolveError> for PortalError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::NoObjectId(subdomain) => PortalError::Resolution(subdomain),
            ResolveError::FullNodeFail(rpc) => PortalError::UpstreamUnavailable(rpc),
        }
    }
}

impl From<FetchError> for PortalError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::LoopDetected(site) => PortalError::LoopDetected(site),
            FetchError::TooManyRedirects => PortalError::TooManyRedirects,
            FetchError::Malformed(message) => PortalError::Internal(message),
            FetchError::Rpc(rpc) => PortalError::UpstreamUnavailable(rpc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_and_not_found_are_identical() {
        let blocked = PortalError::Blocked.into_response();
        let not_found = PortalError::ResourceNotFound.into_response();
        assert_eq!(blocked, not_found);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(PortalError::ChecksumMismatch.into_response().status, 422);
        assert_eq!(
            PortalError::AggregatorStatus(502).into_response().status,
            503
        );
        assert_eq!(
            PortalError::AggregatorStatus(404).into_response().status,
            404
        );
        assert_eq!(
            PortalError::Internal("boom".to_string()).into_response().status,
            500
        );
        assert_eq!(PortalError::TooManyRedirects.into_response().status, 404);
        assert_eq!(
            PortalError::LoopDetected(ObjectId::ZERO).into_response().status,
            404
        );
    }
}
