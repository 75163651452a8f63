//! Walrus aggregator client: blob fetching with retry and failover.
//!
//! A blob is addressed as `{aggregator}/v1/blobs/{url-safe-base64-id}`.
//! The retry policy per endpoint: up to `retries` extra attempts, retrying
//! on transport errors and on HTTP 500, with a fixed delay between
//! attempts. A 500 on an endpoint's final attempt is returned verbatim
//! rather than retried. When several aggregators are configured, the next
//! one is tried after the previous one's attempts are exhausted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("aggregator request failed: {0}")]
    Request(String),
}

/// A raw aggregator response: status and body bytes. Response headers come
/// from the on-chain resource, not from the aggregator.
#[derive(Debug, Clone)]
pub struct BlobResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl BlobResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One blob-serving endpoint.
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// GET the blob, forwarding an optional `Range` header value.
    async fn fetch_blob(
        &self,
        blob_id_b64: &str,
        range: Option<&str>,
    ) -> Result<BlobResponse, AggregatorError>;

    /// Public URL of the blob on this endpoint, for redirects.
    fn blob_url(&self, blob_id_b64: &str) -> String;
}

/// reqwest-backed aggregator endpoint.
pub struct HttpAggregator {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAggregator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, client }
    }
}

#[async_trait]
impl Aggregator for HttpAggregator {
    async fn fetch_blob(
        &self,
        blob_id_b64: &str,
        range: Option<&str>,
    ) -> Result<BlobResponse, AggregatorError> {
        let url = self.blob_url(blob_id_b64);
        let mut request = self.client.get(&url);
        if let Some(range) = range {
            request = request.header("Range", range);
        }
        let response = request
            .send()
            .await
            .map_err(|e| AggregatorError::Request(format!("{url}: {e}")))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| AggregatorError::Request(format!("{url}: {e}")))?
            .to_vec();
        Ok(BlobResponse { status, body })
    }

    fn blob_url(&self, blob_id_b64: &str) -> String {
        format!("{}/v1/blobs/{}", self.base_url, blob_id_b64)
    }
}

/// Counter snapshot for observability. Values only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatorMetricsSnapshot {
    /// Extra attempts beyond the first, across all endpoints.
    pub retries: u64,
    /// Times the next endpoint in the list was tried.
    pub failovers: u64,
}

/// Retry and failover policy over an ordered list of aggregators.
pub struct AggregatorClient {
    endpoints: Vec<Arc<dyn Aggregator>>,
    retries: usize,
    delay: Duration,
    retry_count: AtomicU64,
    failover_count: AtomicU64,
}

/// Default extra attempts per endpoint (3 total).
pub const DEFAULT_AGGREGATOR_RETRIES: usize = 2;

/// Default sleep between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

impl AggregatorClient {
    pub fn new(endpoints: Vec<Arc<dyn Aggregator>>, retries: usize, delay: Duration) -> Self {
        Self {
            endpoints,
            retries,
            delay,
            retry_count: AtomicU64::new(0),
            failover_count: AtomicU64::new(0),
        }
    }

    pub fn metrics(&self) -> AggregatorMetricsSnapshot {
        AggregatorMetricsSnapshot {
            retries: self.retry_count.load(Ordering::Relaxed),
            failovers: self.failover_count.load(Ordering::Relaxed),
        }
    }

    pub fn from_urls(urls: &[String], retries: usize, delay: Duration) -> Self {
        let client = reqwest::Client::new();
        let endpoints = urls
            .iter()
            .map(|url| {
                Arc::new(HttpAggregator::with_client(url.clone(), client.clone()))
                    as Arc<dyn Aggregator>
            })
            .collect();
        Self::new(endpoints, retries, delay)
    }

    /// Public URL of the blob on the preferred endpoint.
    pub fn blob_url(&self, blob_id_b64: &str) -> Option<String> {
        self.endpoints.first().map(|e| e.blob_url(blob_id_b64))
    }

    /// Fetch the blob, applying the per-endpoint retry policy and then
    /// advancing through the endpoint list.
    pub async fn fetch(
        &self,
        blob_id_b64: &str,
        range: Option<&str>,
    ) -> Result<BlobResponse, AggregatorError> {
        let mut last_error: Option<AggregatorError> = None;
        let total = self.endpoints.len();

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            let is_last_endpoint = index + 1 == total;
            match self
                .fetch_one_endpoint(endpoint.as_ref(), blob_id_b64, range)
                .await
            {
                Ok(response) if response.status == 500 && !is_last_endpoint => {
                    self.failover_count.fetch_add(1, Ordering::Relaxed);
                    warn!(blob = blob_id_b64, endpoint = index, "endpoint exhausted with 500, failing over");
                }
                Ok(response) => return Ok(response),
                Err(error) => {
                    if !is_last_endpoint {
                        self.failover_count.fetch_add(1, Ordering::Relaxed);
                    }
                    warn!(blob = blob_id_b64, endpoint = index, error = %error, "endpoint exhausted, failing over");
                    last_error = Some(error);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AggregatorError::Request("no aggregators configured".to_string())))
    }

    /// Run the retry loop against a single endpoint. Returns the final
    /// attempt's outcome verbatim, including a 500.
    async fn fetch_one_endpoint(
        &self,
        endpoint: &dyn Aggregator,
        blob_id_b64: &str,
        range: Option<&str>,
    ) -> Result<BlobResponse, AggregatorError> {
        let attempts = self.retries + 1;
        let mut last_error: Option<AggregatorError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                self.retry_count.fetch_add(1, Ordering::Relaxed);
                tokio::time::sleep(self.delay).await;
            }
            match endpoint.fetch_blob(blob_id_b64, range).await {
                Ok(response) if response.status == 500 && attempt + 1 < attempts => {
                    debug!(blob = blob_id_b64, attempt, "aggregator returned 500, retrying");
                }
                Ok(response) => return Ok(response),
                Err(error) => {
                    debug!(blob = blob_id_b64, attempt, error = %error, "aggregator attempt failed");
                    last_error = Some(error);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AggregatorError::Request("retry loop exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Plays back a fixed sequence of outcomes, then repeats the last.
    struct ScriptedAggregator {
        script: Mutex<Vec<Result<BlobResponse, ()>>>,
        calls: AtomicUsize,
    }

    impl ScriptedAggregator {
        fn new(script: Vec<Result<BlobResponse, ()>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Aggregator for ScriptedAggregator {
        async fn fetch_blob(
            &self,
            _blob_id_b64: &str,
            _range: Option<&str>,
        ) -> Result<BlobResponse, AggregatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock();
            let step = if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            };
            step.map_err(|_| AggregatorError::Request("scripted failure".to_string()))
        }

        fn blob_url(&self, blob_id_b64: &str) -> String {
            format!("scripted/v1/blobs/{blob_id_b64}")
        }
    }

    fn ok(status: u16, body: &[u8]) -> Result<BlobResponse, ()> {
        Ok(BlobResponse {
            status,
            body: body.to_vec(),
        })
    }

    fn client_of(endpoints: Vec<Arc<ScriptedAggregator>>) -> AggregatorClient {
        AggregatorClient::new(
            endpoints
                .into_iter()
                .map(|e| e as Arc<dyn Aggregator>)
                .collect(),
            2,
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let endpoint = ScriptedAggregator::new(vec![ok(200, b"blob")]);
        let client = client_of(vec![Arc::clone(&endpoint)]);
        let response = client.fetch("abc", None).await.unwrap();
        assert_eq!(response.body, b"blob");
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_on_error_then_succeeds() {
        let endpoint = ScriptedAggregator::new(vec![Err(()), ok(200, b"blob")]);
        let client = client_of(vec![Arc::clone(&endpoint)]);
        let response = client.fetch("abc", None).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(endpoint.calls(), 2);
        assert_eq!(client.metrics().retries, 1);
        assert_eq!(client.metrics().failovers, 0);
    }

    #[tokio::test]
    async fn test_retries_on_500_then_succeeds() {
        let endpoint = ScriptedAggregator::new(vec![ok(500, b""), ok(200, b"blob")]);
        let client = client_of(vec![Arc::clone(&endpoint)]);
        let response = client.fetch("abc", None).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(endpoint.calls(), 2);
    }

    #[tokio::test]
    async fn test_final_attempt_500_is_returned_verbatim() {
        let endpoint = ScriptedAggregator::new(vec![ok(500, b"err")]);
        let client = client_of(vec![Arc::clone(&endpoint)]);
        let response = client.fetch("abc", None).await.unwrap();
        assert_eq!(response.status, 500);
        // 3 total attempts: initial + 2 retries.
        assert_eq!(endpoint.calls(), 3);
        assert_eq!(client.metrics().retries, 2);
    }

    #[tokio::test]
    async fn test_non_500_status_is_not_retried() {
        let endpoint = ScriptedAggregator::new(vec![ok(404, b"")]);
        let client = client_of(vec![Arc::clone(&endpoint)]);
        let response = client.fetch("abc", None).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(endpoint.calls(), 1);
    }

    #[tokio::test]
    async fn test_failover_to_second_endpoint() {
        let broken = ScriptedAggregator::new(vec![Err(())]);
        let healthy = ScriptedAggregator::new(vec![ok(200, b"blob")]);
        let client = client_of(vec![Arc::clone(&broken), Arc::clone(&healthy)]);
        let response = client.fetch("abc", None).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(broken.calls(), 3);
        assert_eq!(healthy.calls(), 1);
        assert_eq!(client.metrics().failovers, 1);
        assert_eq!(client.metrics().retries, 2);
    }

    #[tokio::test]
    async fn test_all_endpoints_exhausted() {
        let a = ScriptedAggregator::new(vec![Err(())]);
        let b = ScriptedAggregator::new(vec![Err(())]);
        let client = client_of(vec![a, b]);
        assert!(client.fetch("abc", None).await.is_err());
    }

    #[test]
    fn test_blob_url_building() {
        let aggregator = HttpAggregator::new("https://agg.example/");
        assert_eq!(
            aggregator.blob_url("AbC_x"),
            "https://agg.example/v1/blobs/AbC_x"
        );
    }
}
