//! The transport seam between the selector and the wire.
//!
//! [`RpcTransport`] is the unit the selector multiplexes over. Production
//! uses [`JsonRpcEndpoint`]; tests substitute scripted transports.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    /// The request never produced a JSON-RPC response (connect/IO/decode).
    #[error("rpc transport error against {url}: {message}")]
    Transport { url: String, message: String },

    /// The call exceeded the configured per-call deadline.
    #[error("rpc call timed out after {0} ms")]
    Timeout(u64),

    /// The upstream answered with a protocol-level JSON-RPC error object.
    #[error("upstream rpc error {code}: {message}")]
    Upstream { code: i64, message: String },

    /// The upstream answered 200 but the payload fails the validity rules.
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),

    /// Every configured endpoint failed the same call.
    #[error("all rpc endpoints failed for method '{method}'")]
    AllEndpointsFailed { method: String },
}

/// One upstream endpoint capable of answering JSON-RPC calls.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Issue a single JSON-RPC call and return the `result` member.
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// The endpoint URL, for logging and metric labels.
    fn url(&self) -> &str;
}

/// A JSON-RPC 2.0 endpoint over HTTP.
pub struct JsonRpcEndpoint {
    url: String,
    client: reqwest::Client,
}

impl JsonRpcEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Share one connection pool across endpoints.
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    fn transport_err(&self, message: impl ToString) -> RpcError {
        RpcError::Transport {
            url: self.url.clone(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl RpcTransport for JsonRpcEndpoint {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_err(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.transport_err(format!("http status {}", status)));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| self.transport_err(e))?;

        if let Some(error) = envelope.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown upstream error")
                .to_string();
            return Err(RpcError::Upstream { code, message });
        }

        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| RpcError::InvalidResponse("missing result member".to_string()))
    }

    fn url(&self) -> &str {
        &self.url
    }
}
