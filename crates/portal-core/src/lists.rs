//! Pluggable allow/block list membership checks.
//!
//! Two backends: a remote key/value store (the blocklist service) and a
//! static in-memory set loaded from configuration (the managed-config
//! flavor). A disabled list is simply absent and costs nothing per
//! request.
//!
//! Check failures are availability decisions, not security ones: a list
//! backend outage must not take the whole portal down, so callers treat
//! errors as "not a member" and log them.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ListError {
    #[error("list store request failed: {0}")]
    Request(String),

    #[error("list store returned malformed payload: {0}")]
    Malformed(String),
}

/// Yes/no membership against an external store.
#[async_trait]
pub trait ListChecker: Send + Sync {
    /// Prepare connections; called once at startup.
    async fn init(&self) -> Result<(), ListError> {
        Ok(())
    }

    /// Is `key` a member of the list?
    async fn contains(&self, key: &str) -> Result<bool, ListError>;

    /// Backend reachability, for health endpoints.
    async fn ping(&self) -> bool {
        true
    }

    /// Release resources; optional.
    fn close(&self) {}
}

/// Membership check that swallows backend errors: outages degrade to
/// "not listed" rather than failing the request.
pub async fn is_listed(checker: &dyn ListChecker, key: &str) -> bool {
    match checker.contains(key).await {
        Ok(listed) => listed,
        Err(error) => {
            warn!(key, error = %error, "list check failed, treating as not listed");
            false
        }
    }
}

/// HTTP key/value store backend: `GET {base}/get/{key}` with an optional
/// bearer token; a non-null `result` member means the key is listed.
pub struct KvStoreChecker {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl KvStoreChecker {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            token,
            client: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str) -> Result<Value, ListError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ListError::Request(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(ListError::Request(format!(
                "{url}: status {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| ListError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl ListChecker for KvStoreChecker {
    async fn contains(&self, key: &str) -> Result<bool, ListError> {
        let payload = self.get(&format!("get/{key}")).await?;
        Ok(!payload
            .get("result")
            .map(Value::is_null)
            .unwrap_or(true))
    }

    async fn ping(&self) -> bool {
        self.get("ping").await.is_ok()
    }
}

/// In-memory set loaded from configuration.
pub struct StaticListChecker {
    entries: HashSet<String>,
}

impl StaticListChecker {
    pub fn new(entries: impl IntoIterator<Item = String>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| e.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl ListChecker for StaticListChecker {
    async fn contains(&self, key: &str) -> Result<bool, ListError> {
        Ok(self.entries.contains(&key.to_lowercase()))
    }
}
