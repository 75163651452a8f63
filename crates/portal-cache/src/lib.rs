//! URL-keyed response cache with on-chain version validation.
//!
//! A cached entry is valid only when it is both fresh by wall clock and
//! still anchored to the same chain state: the resource object id the URL
//! resolves to today must equal the cached one, and that object's current
//! version must equal the cached version. The version check costs one
//! `getObject`, which is cheaper than re-running the whole pipeline and
//! re-fetching the blob.
//!
//! The cache is the only shared container that grows with traffic; a byte
//! quota with oldest-first eviction bounds it. Caching is best-effort
//! throughout: every failure path degrades to a miss or a skipped insert.

pub mod metrics;

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, warn};

use portal_rpc::types::ObjectDataOptions;
use portal_rpc::RpcSelector;
use portal_types::response::{
    X_RESOURCE_OBJECT_ID, X_RESOURCE_OBJECT_VERSION, X_UNIX_TIME_CACHED,
};
use portal_types::{ObjectId, PortalResponse};

pub use metrics::{CacheMetrics, CacheMetricsSnapshot};

/// Default entry time-to-live: 24 hours.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default byte quota for cached bodies and headers.
pub const DEFAULT_CACHE_MAX_BYTES: usize = 256 * 1024 * 1024;

/// Entries evicted per quota-relief pass.
const EVICTION_BATCH: usize = 50;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            max_bytes: DEFAULT_CACHE_MAX_BYTES,
        }
    }
}

struct CacheEntry {
    response: PortalResponse,
    resource_id: ObjectId,
    resource_version: String,
    cached_at_ms: i64,
    weight: usize,
    seq: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    total_bytes: usize,
    next_seq: u64,
}

impl CacheState {
    fn remove(&mut self, url: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(url)?;
        self.total_bytes -= entry.weight;
        Some(entry)
    }

    /// Drop up to `limit` oldest entries (insertion order).
    fn evict_oldest(&mut self, limit: usize) -> usize {
        let mut oldest: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|(url, e)| (url.clone(), e.seq))
            .collect();
        oldest.sort_by_key(|(_, seq)| *seq);
        let mut evicted = 0;
        for (url, _) in oldest.into_iter().take(limit) {
            self.remove(&url);
            evicted += 1;
        }
        evicted
    }
}

/// URL-keyed response cache. Safe for concurrent request handlers.
pub struct ResponseCache {
    state: RwLock<CacheState>,
    config: CacheConfig,
    metrics: CacheMetrics,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            config,
            metrics: CacheMetrics::default(),
        }
    }

    pub fn metrics(&self) -> CacheMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.state.read().total_bytes
    }

    /// Look up `url`, validating freshness and chain coordinates.
    ///
    /// `expected_resource_id` is the resource object id the URL resolves to
    /// right now (derived from the freshly resolved site id and path). The
    /// version check issues one `getObject` through `selector`; any
    /// mismatch or failure evicts the entry and reports a miss.
    pub async fn lookup(
        &self,
        url: &str,
        expected_resource_id: &ObjectId,
        selector: &RpcSelector,
    ) -> Option<PortalResponse> {
        let (resource_id, resource_version, cached_at_ms) = {
            let state = self.state.read();
            let entry = match state.entries.get(url) {
                Some(entry) => entry,
                None => {
                    self.metrics.record_miss();
                    return None;
                }
            };
            (
                entry.resource_id,
                entry.resource_version.clone(),
                entry.cached_at_ms,
            )
        };

        let age_ms = now_ms().saturating_sub(cached_at_ms);
        if age_ms > self.config.ttl.as_millis() as i64 {
            debug!(url, age_ms, "cached entry expired");
            self.evict(url);
            self.metrics.record_miss();
            return None;
        }

        if resource_id != *expected_resource_id {
            debug!(url, cached = %resource_id, expected = %expected_resource_id,
                "cached entry anchored to a different resource object");
            self.evict(url);
            self.metrics.record_invalidation();
            self.metrics.record_miss();
            return None;
        }

        let current_version = match selector
            .get_object(&resource_id, &ObjectDataOptions::default())
            .await
        {
            Ok(response) => response.data.map(|d| d.version),
            Err(error) => {
                debug!(url, error = %error, "version check failed, treating as miss");
                None
            }
        };
        if current_version.as_deref() != Some(resource_version.as_str()) {
            debug!(
                url,
                cached_version = %resource_version,
                current_version = current_version.as_deref().unwrap_or("<gone>"),
                "cached entry invalidated by version change"
            );
            self.evict(url);
            self.metrics.record_invalidation();
            self.metrics.record_miss();
            return None;
        }

        let state = self.state.read();
        let entry = state.entries.get(url)?;
        self.metrics.record_hit();
        Some(entry.response.clone())
    }

    /// Clone `response` into the cache under `url`.
    ///
    /// Responses without the full set of telemetry headers are not
    /// cacheable and are skipped. Quota overflow evicts one batch of
    /// oldest entries and retries once; a still-full cache logs a warning
    /// and skips the insert.
    pub fn insert(&self, url: &str, response: &PortalResponse) {
        let Some(resource_id) = response
            .header(X_RESOURCE_OBJECT_ID)
            .and_then(|v| ObjectId::from_hex_literal(v).ok())
        else {
            debug!(url, "response lacks resource id header, not caching");
            return;
        };
        let Some(resource_version) = response.header(X_RESOURCE_OBJECT_VERSION) else {
            debug!(url, "response lacks resource version header, not caching");
            return;
        };
        let Some(cached_at_ms) = response
            .header(X_UNIX_TIME_CACHED)
            .and_then(|v| v.parse::<i64>().ok())
        else {
            debug!(url, "response lacks cache timestamp header, not caching");
            return;
        };

        let weight = response.weight();
        let mut state = self.state.write();
        state.remove(url);

        for attempt in 0..2 {
            if state.total_bytes + weight <= self.config.max_bytes {
                break;
            }
            if attempt == 0 {
                let evicted = state.evict_oldest(EVICTION_BATCH);
                self.metrics.record_evictions(evicted as u64);
                debug!(url, evicted, "evicted oldest entries for quota relief");
            } else {
                warn!(
                    url,
                    weight,
                    max_bytes = self.config.max_bytes,
                    "response exceeds cache quota even after eviction, not caching"
                );
                return;
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.total_bytes += weight;
        state.entries.insert(
            url.to_string(),
            CacheEntry {
                response: response.clone(),
                resource_id,
                resource_version: resource_version.to_string(),
                cached_at_ms,
                weight,
                seq,
            },
        );
    }

    fn evict(&self, url: &str) {
        self.state.write().remove(url);
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Wall-clock milliseconds since the epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use portal_rpc::transport::{RpcError, RpcTransport};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Answers every getObject with a fixed version and counts calls.
    struct VersionTransport {
        version: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RpcTransport for VersionTransport {
        async fn call(&self, _method: &str, params: Value) -> Result<Value, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({
                "data": {"objectId": params[0], "version": self.version}
            }))
        }
        fn url(&self) -> &str {
            "version"
        }
    }

    fn selector_with_version(version: &str) -> (Arc<RpcSelector>, Arc<VersionTransport>) {
        let transport = Arc::new(VersionTransport {
            version: version.to_string(),
            calls: AtomicUsize::new(0),
        });
        let selector = Arc::new(RpcSelector::new(
            vec![Arc::clone(&transport) as Arc<dyn RpcTransport>],
            Duration::from_millis(100),
        ));
        (selector, transport)
    }

    fn resource_id() -> ObjectId {
        ObjectId::from_hex_literal("0xfeed").unwrap()
    }

    fn cacheable_response(version: &str, cached_at_ms: i64) -> PortalResponse {
        PortalResponse::new(200)
            .with_header(X_RESOURCE_OBJECT_ID, resource_id().to_hex())
            .with_header(X_RESOURCE_OBJECT_VERSION, version)
            .with_header(X_UNIX_TIME_CACHED, cached_at_ms.to_string())
            .with_body(b"<html>hi</html>".to_vec())
    }

    #[tokio::test]
    async fn test_hit_when_fresh_and_version_stable() {
        let cache = ResponseCache::default();
        let (selector, transport) = selector_with_version("5");
        cache.insert("https://a.example/", &cacheable_response("5", now_ms()));

        let hit = cache
            .lookup("https://a.example/", &resource_id(), &selector)
            .await
            .unwrap();
        assert_eq!(hit.body, b"<html>hi</html>");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.metrics().hits, 1);
    }

    #[tokio::test]
    async fn test_miss_when_absent() {
        let cache = ResponseCache::default();
        let (selector, transport) = selector_with_version("5");
        assert!(cache
            .lookup("https://a.example/", &resource_id(), &selector)
            .await
            .is_none());
        // No entry means no version check either.
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.metrics().misses, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted() {
        let cache = ResponseCache::new(CacheConfig {
            ttl: Duration::from_secs(60),
            ..Default::default()
        });
        let (selector, _) = selector_with_version("5");
        let stale = now_ms() - 10 * 60 * 1000;
        cache.insert("https://a.example/", &cacheable_response("5", stale));

        assert!(cache
            .lookup("https://a.example/", &resource_id(), &selector)
            .await
            .is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_version_change_invalidates() {
        let cache = ResponseCache::default();
        let (selector, _) = selector_with_version("6");
        cache.insert("https://a.example/", &cacheable_response("5", now_ms()));

        assert!(cache
            .lookup("https://a.example/", &resource_id(), &selector)
            .await
            .is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.metrics().invalidations, 1);
    }

    #[tokio::test]
    async fn test_resource_id_change_invalidates_without_rpc() {
        let cache = ResponseCache::default();
        let (selector, transport) = selector_with_version("5");
        cache.insert("https://a.example/", &cacheable_response("5", now_ms()));

        let other = ObjectId::from_hex_literal("0xbeef").unwrap();
        assert!(cache
            .lookup("https://a.example/", &other, &selector)
            .await
            .is_none());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_uncacheable_response_is_skipped() {
        let cache = ResponseCache::default();
        cache.insert("https://a.example/", &PortalResponse::new(200));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_quota_eviction_oldest_first() {
        // Quota fits two small entries; inserting a third evicts oldest.
        let entry_weight = cacheable_response("1", 0).weight();
        let cache = ResponseCache::new(CacheConfig {
            ttl: DEFAULT_CACHE_TTL,
            max_bytes: entry_weight * 2,
        });

        cache.insert("https://one/", &cacheable_response("1", now_ms()));
        cache.insert("https://two/", &cacheable_response("1", now_ms()));
        assert_eq!(cache.len(), 2);

        cache.insert("https://three/", &cacheable_response("1", now_ms()));
        // The batch eviction clears the old entries and the new one fits.
        assert!(cache.len() <= 2);
        assert!(cache.state.read().entries.contains_key("https://three/"));
        assert!(cache.metrics().evictions > 0);
    }

    #[test]
    fn test_oversized_response_never_caches() {
        let cache = ResponseCache::new(CacheConfig {
            ttl: DEFAULT_CACHE_TTL,
            max_bytes: 8,
        });
        cache.insert("https://big/", &cacheable_response("1", now_ms()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reinsert_replaces_and_keeps_accounting() {
        let cache = ResponseCache::default();
        cache.insert("https://a/", &cacheable_response("1", now_ms()));
        let first_total = cache.total_bytes();
        cache.insert("https://a/", &cacheable_response("2", now_ms()));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), first_total);
    }
}
