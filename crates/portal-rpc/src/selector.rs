//! Sticky-first, race-on-failure endpoint multiplexing.
//!
//! The selector remembers the last endpoint that answered validly and sends
//! every call there first. When that call times out, errors, or fails the
//! validity rules, the sticky slot is cleared and the call is raced against
//! every configured endpoint at once; the first valid answer wins and its
//! endpoint becomes the new sticky choice.
//!
//! Loser futures from the race keep running as detached tasks. Only the
//! dispatching task writes the sticky slot, so a slow loser can never
//! overwrite the winner.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use portal_types::ObjectId;

use crate::transport::{JsonRpcEndpoint, RpcError, RpcTransport};
use crate::types::{
    multi_object_response_is_valid, object_response_is_valid, DynamicFieldName, ObjectDataOptions,
    ObjectResponse,
};

/// Default per-call deadline, overridable via configuration.
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 7000;

type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Counter snapshot for observability. Values only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectorMetricsSnapshot {
    /// Times a sticky endpoint was demoted.
    pub failovers: u64,
    /// Times the all-endpoints race ran.
    pub fallback_races: u64,
}

/// Multiplexer over an ordered list of upstream RPC endpoints.
///
/// The endpoint list is immutable after construction; the only mutable
/// state is the sticky index, guarded for concurrent request handlers.
pub struct RpcSelector {
    endpoints: Vec<Arc<dyn RpcTransport>>,
    selected: RwLock<Option<usize>>,
    timeout: Duration,
    failovers: AtomicU64,
    fallback_races: AtomicU64,
}

impl RpcSelector {
    pub fn new(endpoints: Vec<Arc<dyn RpcTransport>>, timeout: Duration) -> Self {
        Self {
            endpoints,
            selected: RwLock::new(None),
            timeout,
            failovers: AtomicU64::new(0),
            fallback_races: AtomicU64::new(0),
        }
    }

    /// Build a selector of [`JsonRpcEndpoint`]s sharing one HTTP client.
    pub fn from_urls(urls: &[String], timeout: Duration) -> Self {
        let client = reqwest::Client::new();
        let endpoints = urls
            .iter()
            .map(|url| {
                Arc::new(JsonRpcEndpoint::with_client(url.clone(), client.clone()))
                    as Arc<dyn RpcTransport>
            })
            .collect();
        Self::new(endpoints, timeout)
    }

    /// URL of the currently sticky endpoint, if any.
    pub fn selected_url(&self) -> Option<String> {
        let index = (*self.selected.read())?;
        self.endpoints.get(index).map(|e| e.url().to_string())
    }

    pub fn metrics(&self) -> SelectorMetricsSnapshot {
        SelectorMetricsSnapshot {
            failovers: self.failovers.load(Ordering::Relaxed),
            fallback_races: self.fallback_races.load(Ordering::Relaxed),
        }
    }

    // =========================================================================
    // Typed operations
    // =========================================================================

    /// Fetch a single object.
    pub async fn get_object(
        &self,
        id: &ObjectId,
        options: &ObjectDataOptions,
    ) -> Result<ObjectResponse, RpcError> {
        let params = json!([id.to_hex(), options]);
        let value = self
            .dispatch("sui_getObject", params, Arc::new(object_response_is_valid))
            .await?;
        parse_result(value)
    }

    /// Fetch several objects in one call, preserving the requested order.
    pub async fn multi_get_objects(
        &self,
        ids: &[ObjectId],
        options: &ObjectDataOptions,
    ) -> Result<Vec<ObjectResponse>, RpcError> {
        let hex_ids: Vec<String> = ids.iter().map(ObjectId::to_hex).collect();
        let params = json!([hex_ids, options]);
        let expected = ids.len();
        let value = self
            .dispatch(
                "sui_multiGetObjects",
                params,
                Arc::new(move |v: &Value| multi_object_response_is_valid(v, expected)),
            )
            .await?;
        parse_result(value)
    }

    /// Look up a dynamic-field child object of `parent` by key.
    pub async fn get_dynamic_field_object(
        &self,
        parent: &ObjectId,
        name: &DynamicFieldName,
    ) -> Result<ObjectResponse, RpcError> {
        let params = json!([parent.to_hex(), name]);
        let value = self
            .dispatch(
                "suix_getDynamicFieldObject",
                params,
                Arc::new(object_response_is_valid),
            )
            .await?;
        parse_result(value)
    }

    /// Generic escape hatch for methods without a typed wrapper. The only
    /// validity requirement is that the upstream produced a result at all.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.dispatch(method, params, Arc::new(|_: &Value| true))
            .await
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    async fn dispatch(
        &self,
        method: &str,
        params: Value,
        validate: Validator,
    ) -> Result<Value, RpcError> {
        let sticky = *self.selected.read();
        if let Some(index) = sticky {
            match self.call_endpoint(index, method, params.clone()).await {
                Ok(value) if validate(&value) => return Ok(value),
                Ok(_) => {
                    warn!(
                        endpoint = self.endpoints[index].url(),
                        method, "sticky endpoint returned invalid response"
                    );
                }
                Err(error) => {
                    warn!(
                        endpoint = self.endpoints[index].url(),
                        method,
                        error = %error,
                        "sticky endpoint failed"
                    );
                }
            }
            *self.selected.write() = None;
            self.failovers.fetch_add(1, Ordering::Relaxed);
        }

        self.race_all(method, params, validate).await
    }

    async fn call_endpoint(
        &self,
        index: usize,
        method: &str,
        params: Value,
    ) -> Result<Value, RpcError> {
        call_with_timeout(Arc::clone(&self.endpoints[index]), method, params, self.timeout).await
    }

    /// Issue the call to every endpoint at once and take the first valid
    /// answer. Losers run to completion in the background; their sends land
    /// in a closed channel.
    async fn race_all(
        &self,
        method: &str,
        params: Value,
        validate: Validator,
    ) -> Result<Value, RpcError> {
        self.fallback_races.fetch_add(1, Ordering::Relaxed);

        let (tx, mut rx) = mpsc::unbounded_channel();
        for (index, endpoint) in self.endpoints.iter().enumerate() {
            let endpoint = Arc::clone(endpoint);
            let tx = tx.clone();
            let method = method.to_string();
            let params = params.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                let result = call_with_timeout(endpoint, &method, params, timeout).await;
                let _ = tx.send((index, result));
            });
        }
        drop(tx);

        let mut last_error: Option<RpcError> = None;
        while let Some((index, result)) = rx.recv().await {
            match result {
                Ok(value) if validate(&value) => {
                    *self.selected.write() = Some(index);
                    debug!(
                        endpoint = self.endpoints[index].url(),
                        method, "fallback race winner selected"
                    );
                    return Ok(value);
                }
                Ok(_) => {
                    debug!(
                        endpoint = self.endpoints[index].url(),
                        method, "race response failed validity check"
                    );
                }
                Err(error) => {
                    debug!(
                        endpoint = self.endpoints[index].url(),
                        method,
                        error = %error,
                        "race endpoint failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        warn!(method, last_error = ?last_error, "all rpc endpoints failed");
        Err(RpcError::AllEndpointsFailed {
            method: method.to_string(),
        })
    }
}

async fn call_with_timeout(
    endpoint: Arc<dyn RpcTransport>,
    method: &str,
    params: Value,
    timeout: Duration,
) -> Result<Value, RpcError> {
    match tokio::time::timeout(timeout, endpoint.call(method, params)).await {
        Ok(result) => result,
        Err(_) => Err(RpcError::Timeout(timeout.as_millis() as u64)),
    }
}

fn parse_result<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::InvalidResponse(e.to_string()))
}
