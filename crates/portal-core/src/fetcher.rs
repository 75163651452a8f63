//! The URL fetcher: one request's uncached trip through the pipeline.
//!
//! `resolve_and_fetch` composes resolution, resource fetching, routes
//! fallback, blob retrieval, and hash verification into the final
//! response. The routes table is fetched concurrently with the primary
//! resource so the fallback, when needed, costs no extra latency; when the
//! primary fetch succeeds the routes result is simply dropped (the load is
//! idempotent, so best-effort cancellation is safe).

use std::collections::HashSet;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use portal_cache::now_ms;
use portal_fetcher::{ResourceFetcher, RoutesFetcher};
use portal_resolver::SiteResolver;
use portal_types::encoding::base64_encode;
use portal_types::response::{
    X_RESOURCE_OBJECT_ID, X_RESOURCE_OBJECT_VERSION, X_UNIX_TIME_CACHED,
};
use portal_types::site::Range;
use portal_types::{ObjectId, PortalResponse, VersionedResource};

use crate::aggregator::AggregatorClient;
use crate::error::PortalError;
use crate::links::DomainDetails;
use crate::lists::{is_listed, ListChecker};

/// Fallback resource consulted when nothing else matches.
pub const NOT_FOUND_PAGE: &str = "/404.html";

/// The uncached resolution-and-fetch pipeline.
pub struct UrlFetcher {
    resolver: Arc<SiteResolver>,
    resources: Arc<ResourceFetcher>,
    routes: Arc<RoutesFetcher>,
    aggregator: Arc<AggregatorClient>,
}

impl UrlFetcher {
    pub fn new(
        resolver: Arc<SiteResolver>,
        resources: Arc<ResourceFetcher>,
        routes: Arc<RoutesFetcher>,
        aggregator: Arc<AggregatorClient>,
    ) -> Self {
        Self {
            resolver,
            resources,
            routes,
            aggregator,
        }
    }

    pub fn resources(&self) -> &Arc<ResourceFetcher> {
        &self.resources
    }

    pub fn aggregator(&self) -> &Arc<AggregatorClient> {
        &self.aggregator
    }

    /// Resolve a subdomain to its site object id.
    pub async fn resolve_site(&self, subdomain: &str) -> Result<ObjectId, PortalError> {
        Ok(self.resolver.resolve(subdomain).await?)
    }

    /// Serve `domain` end to end.
    ///
    /// `pre_resolved` skips resolution when the caller already holds the
    /// site id (the cache layer resolves early to validate entries).
    /// `blocklist` is consulted on the resolved id; blocked sites are
    /// indistinguishable from missing ones in the response.
    pub async fn resolve_and_fetch(
        &self,
        domain: &DomainDetails,
        pre_resolved: Option<ObjectId>,
        blocklist: Option<&Arc<dyn ListChecker>>,
    ) -> Result<PortalResponse, PortalError> {
        let site = match pre_resolved {
            Some(site) => site,
            None => self.resolve_site(&domain.subdomain).await?,
        };

        if let Some(list) = blocklist {
            if is_listed(list.as_ref(), &site.to_hex()).await {
                return Err(PortalError::Blocked);
            }
        }

        // Fire the routes fetch now; it is only awaited on the fallback
        // path.
        let routes_task = {
            let routes = Arc::clone(&self.routes);
            tokio::spawn(async move { routes.load(site).await })
        };

        let mut visited = HashSet::new();
        let mut resource = self
            .resources
            .fetch_resource(site, &domain.path, &mut visited, 0)
            .await?;

        if resource.is_none() {
            let routes = match routes_task.await {
                Ok(Ok(routes)) => routes,
                Ok(Err(error)) => {
                    warn!(site = %site, error = %error, "routes fetch failed, skipping fallback");
                    None
                }
                Err(join_error) => {
                    warn!(site = %site, error = %join_error, "routes task panicked");
                    None
                }
            };

            if let Some(routes) = routes {
                if let Some(target) = routes.match_path(&domain.path) {
                    debug!(site = %site, path = %domain.path, target, "routes fallback matched");
                    visited.clear();
                    resource = self
                        .resources
                        .fetch_resource(site, target, &mut visited, 0)
                        .await?;
                }
            }

            if resource.is_none() && domain.path != NOT_FOUND_PAGE {
                visited.clear();
                resource = self
                    .resources
                    .fetch_resource(site, NOT_FOUND_PAGE, &mut visited, 0)
                    .await?;
            }
        }

        let Some(versioned) = resource else {
            return Err(PortalError::ResourceNotFound);
        };

        self.fetch_blob_response(&versioned).await
    }

    /// Steps 6-10: translate the range, fetch the blob, verify its hash,
    /// and assemble the response.
    async fn fetch_blob_response(
        &self,
        versioned: &VersionedResource,
    ) -> Result<PortalResponse, PortalError> {
        let blob_id = versioned.resource.blob_id.to_url_base64();
        let range = versioned
            .resource
            .range
            .as_ref()
            .and_then(Range::to_header_value);

        let blob = self
            .aggregator
            .fetch(&blob_id, range.as_deref())
            .await
            .map_err(PortalError::AggregatorUnreachable)?;
        if !blob.is_success() {
            return Err(PortalError::AggregatorStatus(blob.status));
        }

        let digest = Sha256::digest(&blob.body);
        let actual = base64_encode(&digest);
        let expected = versioned.resource.blob_hash.to_standard_base64_be();
        if actual != expected {
            warn!(
                blob = %blob_id,
                expected = %expected,
                actual = %actual,
                "aggregator payload failed hash verification"
            );
            return Err(PortalError::ChecksumMismatch);
        }

        let mut response = PortalResponse::new(200).with_body(blob.body);
        for (name, value) in versioned.resource.headers.iter() {
            response.headers.push((name.clone(), value.clone()));
        }
        response.set_header(X_RESOURCE_OBJECT_ID, versioned.object_id.to_hex());
        response.set_header(X_RESOURCE_OBJECT_VERSION, versioned.version.clone());
        response.set_header(X_UNIX_TIME_CACHED, now_ms().to_string());
        Ok(response)
    }
}
