//! SuiNS name-record lookup.
//!
//! The registry is an on-chain `Table<Domain, NameRecord>`; a record lookup
//! is one `getDynamicFieldObject` against the registry table, keyed by the
//! domain's labels in TLD-first order (`"mysite.sui"` keys as
//! `["sui", "mysite"]`).

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use portal_rpc::transport::RpcError;
use portal_rpc::types::DynamicFieldName;
use portal_rpc::RpcSelector;
use portal_types::ObjectId;

/// A resolved name-service record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub name: String,
    pub target_address: Option<ObjectId>,
    pub walrus_site_id: Option<ObjectId>,
}

/// Chain coordinates of the name service. Configuration may override both
/// ids; the defaults track the current deployments.
#[derive(Debug, Clone)]
pub struct NameServiceConfig {
    /// Package publishing the `domain::Domain` key type.
    pub package_id: ObjectId,
    /// The registry table whose dynamic fields are the name records.
    pub registry_id: ObjectId,
}

impl NameServiceConfig {
    pub fn mainnet() -> Self {
        Self {
            package_id: ObjectId::from_hex_literal(
                "0xd22b24490e0bae52676651b4f56660a5ff8022a2576e0089f79b3c88d44e08f0",
            )
            .expect("static id"),
            registry_id: ObjectId::from_hex_literal(
                "0xe64cd9db9f829c6cc405d9790bd71567ae07259855f4fba6f02c84f52298c106",
            )
            .expect("static id"),
        }
    }

    pub fn testnet() -> Self {
        Self {
            package_id: ObjectId::from_hex_literal(
                "0x22fa05f21b1ad71442491220bb9338f7b7095fe35000ef88d5400d28523bdd93",
            )
            .expect("static id"),
            registry_id: ObjectId::from_hex_literal(
                "0xb120c0d55432630fce61f7854795a3463deb6e3b443cc4ae72e1282073ff56e4",
            )
            .expect("static id"),
        }
    }
}

/// Client for name-record lookups through the shared RPC selector.
pub struct NameServiceClient {
    selector: Arc<RpcSelector>,
    config: NameServiceConfig,
}

impl NameServiceClient {
    pub fn new(selector: Arc<RpcSelector>, config: NameServiceConfig) -> Self {
        Self { selector, config }
    }

    /// Fetch the name record for `name` (with or without the `.sui`
    /// suffix). `Ok(None)` means the name is unregistered.
    pub async fn get_name_record(&self, name: &str) -> Result<Option<NameRecord>, RpcError> {
        let labels = domain_labels(name);
        let field_name = DynamicFieldName {
            type_: format!("{}::domain::Domain", self.config.package_id.to_hex()),
            value: json!({ "labels": labels }),
        };

        let response = self
            .selector
            .get_dynamic_field_object(&self.config.registry_id, &field_name)
            .await?;

        let Some(data) = response.data else {
            debug!(name, "name record not found");
            return Ok(None);
        };
        Ok(parse_name_record(name, data.content.as_ref()))
    }
}

/// Split a name into registry labels, TLD first. A missing `.sui` suffix is
/// implied: `"mysite"` and `"mysite.sui"` key the same record.
fn domain_labels(name: &str) -> Vec<String> {
    let name = name.trim_end_matches('.');
    let base = name.strip_suffix(".sui").unwrap_or(name);
    let mut labels: Vec<String> = base.split('.').map(str::to_string).collect();
    labels.push("sui".to_string());
    labels.reverse();
    labels
}

/// Pull the record out of the dynamic field's JSON content. The value sits
/// under `fields.value.fields`; `walrus_site_id` lives in the record's
/// `data` VecMap.
fn parse_name_record(name: &str, content: Option<&Value>) -> Option<NameRecord> {
    let fields = content?.pointer("/fields/value/fields")?;

    let target_address = fields
        .get("target_address")
        .and_then(Value::as_str)
        .and_then(|s| ObjectId::from_hex_literal(s).ok());

    let mut walrus_site_id = None;
    if let Some(entries) = fields
        .pointer("/data/fields/contents")
        .and_then(Value::as_array)
    {
        for entry in entries {
            if entry.pointer("/fields/key").and_then(Value::as_str) == Some("walrus_site_id") {
                walrus_site_id = entry
                    .pointer("/fields/value")
                    .and_then(Value::as_str)
                    .and_then(|s| ObjectId::from_hex_literal(s).ok());
            }
        }
    }

    Some(NameRecord {
        name: name.to_string(),
        target_address,
        walrus_site_id,
    })
}
