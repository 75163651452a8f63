//! Scripted chain and aggregator doubles.
//!
//! `MockChain` answers the three JSON-RPC methods the portal issues from
//! an in-memory object map; `MockAggregator` serves blob bytes keyed by
//! their URL-safe Base64 id. Both count traffic so tests can assert on
//! call budgets.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use portal_core::aggregator::{Aggregator, AggregatorError, BlobResponse};
use portal_fetcher::{derive_resource_id, RoutesFetcher, DISPLAY_REDIRECT_KEY};
use portal_rpc::transport::{RpcError, RpcTransport};
use portal_types::encoding::base64_encode;
use portal_types::site::{Resource, ResourcePath, U256Le, VecMap, ROUTES_FIELD_KEY};
use portal_types::ObjectId;

/// Site package id used across the test fixtures.
pub fn test_site_package() -> ObjectId {
    ObjectId::from_hex_literal("0x2").unwrap()
}

pub fn object_id(n: u8) -> ObjectId {
    let mut bytes = [0u8; 32];
    bytes[31] = n;
    ObjectId::new(bytes)
}

/// In-memory chain state plus the blob store that backs it.
pub struct MockChain {
    objects: RwLock<HashMap<String, Value>>,
    name_records: RwLock<HashMap<String, ObjectId>>,
    pub aggregator: Arc<MockAggregator>,
    calls: AtomicUsize,
    next_blob: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: RwLock::new(HashMap::new()),
            name_records: RwLock::new(HashMap::new()),
            aggregator: Arc::new(MockAggregator::default()),
            calls: AtomicUsize::new(0),
            next_blob: AtomicUsize::new(1),
        })
    }

    pub fn rpc_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Register a plain site object with no display record.
    pub fn add_site(&self, site: ObjectId) {
        self.objects.write().insert(
            site.to_hex(),
            json!({"data": {"objectId": site.to_hex(), "version": "1"}}),
        );
    }

    /// Register a site whose display record redirects to `target`.
    pub fn add_redirecting_site(&self, site: ObjectId, target: ObjectId) {
        self.objects.write().insert(
            site.to_hex(),
            json!({
                "data": {
                    "objectId": site.to_hex(),
                    "version": "1",
                    "display": {"data": {DISPLAY_REDIRECT_KEY: target.to_hex()}, "error": null},
                }
            }),
        );
    }

    /// Store a resource under `site` at `path`, backing it with `body` in
    /// the aggregator. Returns the resource field's object id and the
    /// blob's URL-safe Base64 id.
    pub fn add_resource(&self, site: ObjectId, path: &str, body: &[u8]) -> (ObjectId, String) {
        self.add_resource_with_headers(site, path, body, &[("content-type", "text/html")])
    }

    pub fn add_resource_with_headers(
        &self,
        site: ObjectId,
        path: &str,
        body: &[u8],
        headers: &[(&str, &str)],
    ) -> (ObjectId, String) {
        let field_id = derive_resource_id(test_site_package(), site, path).unwrap();

        let blob_seq = self.next_blob.fetch_add(1, Ordering::SeqCst);
        let mut blob_le = [0u8; 32];
        blob_le[..8].copy_from_slice(&(blob_seq as u64).to_le_bytes());
        let blob_id = U256Le::from_le_bytes(blob_le);

        let digest: [u8; 32] = Sha256::digest(body).into();
        let blob_hash = U256Le::from_be_bytes(digest);

        let resource = Resource {
            path: path.to_string(),
            headers: headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect::<VecMap<String, String>>(),
            blob_id,
            blob_hash,
            range: None,
        };

        let mut payload = Vec::new();
        payload.extend_from_slice(field_id.as_bytes());
        payload.extend_from_slice(
            &bcs::to_bytes(&ResourcePath {
                path: path.to_string(),
            })
            .unwrap(),
        );
        payload.extend_from_slice(&bcs::to_bytes(&resource).unwrap());

        self.objects.write().insert(
            field_id.to_hex(),
            json!({
                "data": {
                    "objectId": field_id.to_hex(),
                    "version": "1",
                    "bcs": {"dataType": "moveObject", "bcsBytes": base64_encode(&payload)},
                }
            }),
        );

        let blob_b64 = blob_id.to_url_base64();
        self.aggregator.put_blob(&blob_b64, body);
        (field_id, blob_b64)
    }

    /// Store a routes table for `site`.
    pub fn add_routes(&self, site: ObjectId, entries: &[(&str, &str)]) {
        let field_id = RoutesFetcher::derive_routes_id(site).unwrap();
        let map: VecMap<String, String> = entries
            .iter()
            .map(|(p, t)| (p.to_string(), t.to_string()))
            .collect();

        let mut payload = Vec::new();
        payload.extend_from_slice(field_id.as_bytes());
        payload.extend_from_slice(&bcs::to_bytes(&ROUTES_FIELD_KEY.to_vec()).unwrap());
        payload.extend_from_slice(&bcs::to_bytes(&map).unwrap());

        self.objects.write().insert(
            field_id.to_hex(),
            json!({
                "data": {
                    "objectId": field_id.to_hex(),
                    "version": "1",
                    "bcs": {"dataType": "moveObject", "bcsBytes": base64_encode(&payload)},
                }
            }),
        );
    }

    /// Register a SuiNS record pointing `name` (without `.sui`) at `site`.
    pub fn add_name_record(&self, name: &str, site: ObjectId) {
        self.name_records.write().insert(name.to_string(), site);
    }

    /// Advance the stored version of an object, invalidating caches.
    pub fn bump_version(&self, id: ObjectId) {
        let mut objects = self.objects.write();
        if let Some(value) = objects.get_mut(&id.to_hex()) {
            let version = value
                .pointer("/data/version")
                .and_then(Value::as_str)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(1);
            value["data"]["version"] = json!((version + 1).to_string());
        }
    }

    fn lookup(&self, id: &str) -> Value {
        self.objects
            .read()
            .get(id)
            .cloned()
            .unwrap_or_else(|| json!({"error": {"code": "notExists"}}))
    }

    fn name_record_response(&self, params: &Value) -> Value {
        // Labels arrive TLD-first: ["sui", "mysite", ...].
        let labels = params
            .pointer("/1/value/labels")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let name = labels
            .iter()
            .skip(1)
            .rev()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(".");
        match self.name_records.read().get(&name) {
            Some(site) => json!({
                "data": {
                    "objectId": "0x99",
                    "version": "1",
                    "content": {
                        "dataType": "moveObject",
                        "fields": {"value": {"fields": {
                            "target_address": null,
                            "data": {"fields": {"contents": [
                                {"fields": {"key": "walrus_site_id", "value": site.to_hex()}}
                            ]}},
                        }}}
                    }
                }
            }),
            None => json!({"error": {"code": "dynamicFieldNotFound"}}),
        }
    }
}

#[async_trait]
impl RpcTransport for MockChain {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match method {
            "sui_multiGetObjects" => {
                let ids = params[0].as_array().cloned().unwrap_or_default();
                Ok(Value::Array(
                    ids.iter()
                        .map(|id| self.lookup(id.as_str().unwrap_or_default()))
                        .collect(),
                ))
            }
            "sui_getObject" => Ok(self.lookup(params[0].as_str().unwrap_or_default())),
            "suix_getDynamicFieldObject" => Ok(self.name_record_response(&params)),
            other => Err(RpcError::InvalidResponse(format!(
                "mock chain has no method {other}"
            ))),
        }
    }

    fn url(&self) -> &str {
        "mock-chain"
    }
}

/// Blob store double with fetch accounting and corruption support.
#[derive(Default)]
pub struct MockAggregator {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    fetches: AtomicUsize,
}

impl MockAggregator {
    pub fn put_blob(&self, blob_id_b64: &str, body: &[u8]) {
        self.blobs
            .write()
            .insert(blob_id_b64.to_string(), body.to_vec());
    }

    /// Flip one bit of a stored blob so its hash no longer matches.
    pub fn corrupt_blob(&self, blob_id_b64: &str) {
        if let Some(body) = self.blobs.write().get_mut(blob_id_b64) {
            if let Some(byte) = body.first_mut() {
                *byte ^= 0x01;
            }
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Aggregator for MockAggregator {
    async fn fetch_blob(
        &self,
        blob_id_b64: &str,
        _range: Option<&str>,
    ) -> Result<BlobResponse, AggregatorError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.blobs.read().get(blob_id_b64) {
            Some(body) => Ok(BlobResponse {
                status: 200,
                body: body.clone(),
            }),
            None => Ok(BlobResponse {
                status: 404,
                body: Vec::new(),
            }),
        }
    }

    fn blob_url(&self, blob_id_b64: &str) -> String {
        format!("https://mock-aggregator/v1/blobs/{blob_id_b64}")
    }
}
