//! Assembles a full [`PortalService`] over the mock chain and aggregator.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use portal_cache::{CacheConfig, ResponseCache};
use portal_core::aggregator::{Aggregator, AggregatorClient};
use portal_core::links::DomainSplit;
use portal_core::lists::{ListChecker, StaticListChecker};
use portal_core::{PortalService, UrlFetcher};
use portal_fetcher::{ResourceFetcher, RoutesFetcher};
use portal_resolver::{NameServiceClient, NameServiceConfig, SiteResolver};
use portal_rpc::transport::RpcTransport;
use portal_rpc::RpcSelector;
use portal_types::ObjectId;

use super::chain::{test_site_package, MockChain};

pub const PORTAL_DOMAIN: &str = "portal.example";

pub struct TestPortalBuilder {
    chain: Arc<MockChain>,
    b36_enabled: bool,
    landing: Option<String>,
    hardcoded: HashMap<String, ObjectId>,
    blocklist: Option<Vec<String>>,
    cache_ttl: Duration,
    offline: bool,
}

impl TestPortalBuilder {
    pub fn new(chain: Arc<MockChain>) -> Self {
        Self {
            chain,
            b36_enabled: true,
            landing: None,
            hardcoded: HashMap::new(),
            blocklist: None,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            offline: false,
        }
    }

    pub fn with_landing(mut self, landing: &str) -> Self {
        self.landing = Some(landing.to_string());
        self
    }

    pub fn with_hardcoded(mut self, subdomain: &str, site: ObjectId) -> Self {
        self.hardcoded.insert(subdomain.to_string(), site);
        self
    }

    pub fn with_blocklist(mut self, entries: &[&str]) -> Self {
        self.blocklist = Some(entries.iter().map(|e| e.to_string()).collect());
        self
    }

    pub fn without_b36(mut self) -> Self {
        self.b36_enabled = false;
        self
    }

    /// Simulate every RPC endpoint being unreachable.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn build(self) -> PortalService {
        let endpoints: Vec<Arc<dyn RpcTransport>> = if self.offline {
            Vec::new()
        } else {
            vec![Arc::clone(&self.chain) as Arc<dyn RpcTransport>]
        };
        let selector = Arc::new(RpcSelector::new(endpoints, Duration::from_millis(500)));

        let name_service = Arc::new(NameServiceClient::new(
            Arc::clone(&selector),
            NameServiceConfig::mainnet(),
        ));
        let resolver = Arc::new(SiteResolver::new(
            self.hardcoded,
            self.b36_enabled,
            name_service,
        ));
        let resources = Arc::new(ResourceFetcher::new(
            Arc::clone(&selector),
            test_site_package(),
        ));
        let routes = Arc::new(RoutesFetcher::new(Arc::clone(&selector)));
        let aggregator = Arc::new(AggregatorClient::new(
            vec![Arc::clone(&self.chain.aggregator) as Arc<dyn Aggregator>],
            1,
            Duration::from_millis(1),
        ));
        let fetcher = Arc::new(UrlFetcher::new(resolver, resources, routes, aggregator));

        let blocklist: Option<Arc<dyn ListChecker>> = self
            .blocklist
            .map(|entries| Arc::new(StaticListChecker::new(entries)) as Arc<dyn ListChecker>);

        PortalService::new(
            DomainSplit {
                portal_domain: Some(PORTAL_DOMAIN.to_string()),
                ..Default::default()
            },
            self.landing,
            test_site_package(),
            fetcher,
            None,
            Arc::new(ResponseCache::new(CacheConfig {
                ttl: self.cache_ttl,
                ..Default::default()
            })),
            blocklist,
            None,
        )
    }
}
