//! The cache-wrapped portal service: what the HTTP front end calls.
//!
//! Request flow: synthetic links, host splitting, subdomain blocklist,
//! resolution, object-id blocklist, allowlist tier selection, cache
//! lookup, and only then the full pipeline. Every outcome is a
//! [`PortalResponse`]; errors are translated, never propagated to the
//! front end.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use portal_cache::{CacheConfig, ResponseCache};
use portal_fetcher::{derive_resource_id, ResourceFetcher, RoutesFetcher};
use portal_resolver::{NameServiceClient, SiteResolver};
use portal_rpc::RpcSelector;
use portal_types::{ObjectId, PortalResponse};

use crate::aggregator::AggregatorClient;
use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::fetcher::UrlFetcher;
use crate::links::{
    normalize_path, parse_synthetic_request, DomainDetails, DomainSplit, SyntheticRedirect,
};
use crate::lists::{is_listed, KvStoreChecker, ListChecker, StaticListChecker};
use crate::pages;

pub struct PortalService {
    domain_split: DomainSplit,
    landing_page_oid_b36: Option<String>,
    site_package: ObjectId,
    standard: Arc<UrlFetcher>,
    premium: Option<Arc<UrlFetcher>>,
    cache: Arc<ResponseCache>,
    blocklist: Option<Arc<dyn ListChecker>>,
    allowlist: Option<Arc<dyn ListChecker>>,
}

impl PortalService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        domain_split: DomainSplit,
        landing_page_oid_b36: Option<String>,
        site_package: ObjectId,
        standard: Arc<UrlFetcher>,
        premium: Option<Arc<UrlFetcher>>,
        cache: Arc<ResponseCache>,
        blocklist: Option<Arc<dyn ListChecker>>,
        allowlist: Option<Arc<dyn ListChecker>>,
    ) -> Self {
        Self {
            domain_split,
            landing_page_oid_b36,
            site_package,
            standard,
            premium,
            cache,
            blocklist,
            allowlist,
        }
    }

    /// Assemble the full production stack from configuration.
    pub fn from_config(config: &PortalConfig) -> Result<Self> {
        let site_package = config.site_package();
        let aggregator = Arc::new(AggregatorClient::from_urls(
            &config.aggregator_url_strings(),
            config.aggregator_retries,
            config.aggregator_retry_delay(),
        ));

        let build_stack = |urls: &[String]| -> Arc<UrlFetcher> {
            let selector = Arc::new(RpcSelector::from_urls(urls, config.rpc_timeout()));
            let name_service = Arc::new(NameServiceClient::new(
                Arc::clone(&selector),
                config.name_service(),
            ));
            let resolver = Arc::new(SiteResolver::new(
                config.hardcoded_subdomains.clone(),
                config.b36_domain_resolution,
                name_service,
            ));
            let resources = Arc::new(ResourceFetcher::new(Arc::clone(&selector), site_package));
            let routes = Arc::new(RoutesFetcher::new(selector));
            Arc::new(UrlFetcher::new(
                resolver,
                resources,
                routes,
                Arc::clone(&aggregator),
            ))
        };

        let standard = build_stack(&config.rpc_url_strings());
        let premium_urls = config.premium_rpc_url_strings();
        let premium = if premium_urls.is_empty() {
            None
        } else {
            Some(build_stack(&premium_urls))
        };

        let blocklist = if config.enable_blocklist {
            Some(build_checker(
                config.blocklist_kv_url.as_deref(),
                config.blocklist_kv_token.clone(),
                &config.blocklist_entries,
            ))
        } else {
            None
        };
        let allowlist = if config.enable_allowlist {
            Some(build_checker(
                config.allowlist_kv_url.as_deref(),
                config.allowlist_kv_token.clone(),
                &config.allowlist_entries,
            ))
        } else {
            None
        };

        let cache = Arc::new(ResponseCache::new(CacheConfig {
            ttl: config.cache_ttl(),
            max_bytes: config.cache_max_bytes,
        }));

        Ok(Self::new(
            config.domain_split(),
            config.landing_page_oid_b36.clone(),
            site_package,
            standard,
            premium,
            cache,
            blocklist,
            allowlist,
        ))
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Serve one request, given the inbound `Host` value and path.
    pub async fn handle_request(&self, host: &str, path: &str) -> PortalResponse {
        if let Some(redirect) = parse_synthetic_request(host, path) {
            return self.synthetic_redirect(redirect);
        }

        let Some(subdomain) = self.domain_split.subdomain_of(host) else {
            return self.landing_redirect(host);
        };

        if let Some(blocklist) = &self.blocklist {
            if is_listed(blocklist.as_ref(), &subdomain).await {
                info!(subdomain = %subdomain, "blocked subdomain");
                return pages::site_not_found();
            }
        }

        let details = DomainDetails {
            subdomain,
            path: normalize_path(path),
        };

        let site = match self.standard.resolve_site(&details.subdomain).await {
            Ok(site) => site,
            Err(error) => return error.into_response(),
        };

        if let Some(blocklist) = &self.blocklist {
            if is_listed(blocklist.as_ref(), &site.to_hex()).await {
                info!(site = %site, "blocked site object");
                return PortalError::Blocked.into_response();
            }
        }

        // Allowlisted sites get the premium RPC stack when one exists.
        let fetcher = match (&self.allowlist, &self.premium) {
            (Some(allowlist), Some(premium))
                if is_listed(allowlist.as_ref(), &site.to_hex()).await =>
            {
                debug!(site = %site, "using premium rpc stack");
                premium
            }
            _ => &self.standard,
        };

        let url_key = format!("https://{}{}", host.to_lowercase(), details.path);
        let expected_resource = derive_resource_id(self.site_package, site, &details.path).ok();
        if let Some(expected) = &expected_resource {
            if let Some(hit) = self
                .cache
                .lookup(&url_key, expected, fetcher.resources().selector())
                .await
            {
                debug!(url = %url_key, "served from cache");
                return hit;
            }
        }

        match fetcher.resolve_and_fetch(&details, Some(site), None).await {
            Ok(response) => {
                if response.status == 200 {
                    self.cache.insert(&url_key, &response);
                }
                response
            }
            Err(error) => error.into_response(),
        }
    }

    fn synthetic_redirect(&self, redirect: SyntheticRedirect) -> PortalResponse {
        match redirect {
            SyntheticRedirect::Site { subdomain, path } => {
                let Some(portal_domain) = &self.domain_split.portal_domain else {
                    return pages::site_not_found();
                };
                pages::redirect(&format!("https://{subdomain}.{portal_domain}{path}"))
            }
            SyntheticRedirect::Blob { blob_id } => {
                match self.standard.aggregator().blob_url(&blob_id) {
                    Some(url) => pages::redirect(&url),
                    None => pages::site_not_found(),
                }
            }
        }
    }

    /// The bare portal domain redirects to the landing site when one is
    /// configured.
    fn landing_redirect(&self, host: &str) -> PortalResponse {
        match (&self.landing_page_oid_b36, &self.domain_split.portal_domain) {
            (Some(landing), Some(portal_domain)) => {
                pages::redirect(&format!("https://{landing}.{portal_domain}/"))
            }
            _ => {
                debug!(host, "no subdomain and no landing page configured");
                pages::site_not_found()
            }
        }
    }
}

fn build_checker(
    kv_url: Option<&str>,
    kv_token: Option<String>,
    entries: &[String],
) -> Arc<dyn ListChecker> {
    match kv_url {
        Some(url) => Arc::new(KvStoreChecker::new(url, kv_token)),
        None => Arc::new(StaticListChecker::new(entries.iter().cloned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_resolver::NameServiceConfig;
    use std::time::Duration;

    /// A service with no reachable upstreams; everything past resolution
    /// fails with 503.
    fn offline_service(domain: Option<&str>, landing: Option<&str>) -> PortalService {
        let selector = Arc::new(RpcSelector::new(vec![], Duration::from_millis(10)));
        let name_service = Arc::new(NameServiceClient::new(
            Arc::clone(&selector),
            NameServiceConfig::mainnet(),
        ));
        let resolver = Arc::new(SiteResolver::new(Default::default(), true, name_service));
        let site_package = ObjectId::from_hex_literal("0x2").unwrap();
        let resources = Arc::new(ResourceFetcher::new(Arc::clone(&selector), site_package));
        let routes = Arc::new(RoutesFetcher::new(selector));
        let aggregator = Arc::new(AggregatorClient::from_urls(
            &["https://agg.example".to_string()],
            0,
            Duration::from_millis(1),
        ));
        let fetcher = Arc::new(UrlFetcher::new(resolver, resources, routes, aggregator));

        PortalService::new(
            DomainSplit {
                portal_domain: domain.map(str::to_string),
                ..Default::default()
            },
            landing.map(str::to_string),
            site_package,
            fetcher,
            None,
            Arc::new(ResponseCache::default()),
            None,
            None,
        )
    }

    #[tokio::test]
    async fn test_suiobj_synthetic_redirect() {
        let service = offline_service(Some("portal.example"), None);
        let response = service
            .handle_request("abc.suiobj.invalid", "/page.html")
            .await;
        assert_eq!(response.status, 302);
        assert_eq!(
            response.header("location"),
            Some("https://abc.portal.example/page.html")
        );
    }

    #[tokio::test]
    async fn test_blobid_synthetic_redirect() {
        let service = offline_service(Some("portal.example"), None);
        let response = service
            .handle_request("blobid.walrus.invalid", "/QUJD")
            .await;
        assert_eq!(response.status, 302);
        assert_eq!(
            response.header("location"),
            Some("https://agg.example/v1/blobs/QUJD")
        );
    }

    #[tokio::test]
    async fn test_bare_domain_redirects_to_landing() {
        let service = offline_service(Some("portal.example"), Some("landing36"));
        let response = service.handle_request("portal.example", "/").await;
        assert_eq!(response.status, 302);
        assert_eq!(
            response.header("location"),
            Some("https://landing36.portal.example/")
        );
    }

    #[tokio::test]
    async fn test_bare_domain_without_landing_is_not_found() {
        let service = offline_service(Some("portal.example"), None);
        let response = service.handle_request("portal.example", "/").await;
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_maps_to_503() {
        let service = offline_service(Some("portal.example"), None);
        let response = service
            .handle_request("mysite.portal.example", "/index.html")
            .await;
        assert_eq!(response.status, 503);
    }
}
