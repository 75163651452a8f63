//! The slice of the Sui JSON-RPC object model the portal consumes.
//!
//! Responses carry either `data` or a structured `error`; an object that
//! legitimately does not exist is a *valid* response (it answers the
//! question), while a payload with neither member indicates a broken or
//! lagging upstream and must trigger endpoint failover.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use portal_types::encoding::{base64_decode, EncodingError};
use portal_types::ObjectId;

/// Options forwarded to `sui_getObject` / `sui_multiGetObjects`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDataOptions {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_bcs: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_display: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_content: bool,
}

impl ObjectDataOptions {
    /// The options every resource fetch uses: BCS for the payload, display
    /// for the redirect key.
    pub fn bcs_and_display() -> Self {
        Self {
            show_bcs: true,
            show_display: true,
            show_content: false,
        }
    }

    pub fn bcs_only() -> Self {
        Self {
            show_bcs: true,
            show_display: false,
            show_content: false,
        }
    }

    pub fn content_only() -> Self {
        Self {
            show_bcs: false,
            show_display: false,
            show_content: true,
        }
    }
}

/// The name argument of `suix_getDynamicFieldObject`.
#[derive(Debug, Clone, Serialize)]
pub struct DynamicFieldName {
    #[serde(rename = "type")]
    pub type_: String,
    pub value: Value,
}

/// One `SuiObjectResponse`.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectResponse {
    pub data: Option<ObjectData>,
    pub error: Option<ObjectResponseError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    pub object_id: ObjectId,
    pub version: String,
    pub digest: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub bcs: Option<BcsData>,
    pub display: Option<DisplayFields>,
    pub content: Option<Value>,
}

/// `data.bcs` for a Move object. Package payloads have a different shape
/// and are never requested by the portal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BcsData {
    pub data_type: Option<String>,
    pub bcs_bytes: Option<String>,
}

impl BcsData {
    /// Decode the Base64 `bcsBytes` payload.
    pub fn decode(&self) -> Result<Vec<u8>, EncodingError> {
        match &self.bcs_bytes {
            Some(encoded) => base64_decode(encoded, "object bcs payload"),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayFields {
    pub data: Option<std::collections::HashMap<String, String>>,
    pub error: Option<Value>,
}

/// Structured object-level error (`notExists`, `deleted`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectResponseError {
    pub code: String,
}

impl ObjectResponse {
    /// A response is valid when it answers the question either way.
    pub fn is_valid(&self) -> bool {
        self.data.is_some() || self.error.is_some()
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// The display-record value for `key`, if the object carries one.
    pub fn display_value(&self, key: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .display
            .as_ref()?
            .data
            .as_ref()?
            .get(key)
            .map(String::as_str)
    }
}

/// Validity of a raw `sui_getObject` / `suix_getDynamicFieldObject` result.
pub fn object_response_is_valid(value: &Value) -> bool {
    match serde_json::from_value::<ObjectResponse>(value.clone()) {
        Ok(response) => response.is_valid(),
        Err(_) => false,
    }
}

/// Validity of a raw `sui_multiGetObjects` result for `expected` ids: an
/// array of exactly that many individually valid responses.
pub fn multi_object_response_is_valid(value: &Value, expected: usize) -> bool {
    match value.as_array() {
        Some(items) => items.len() == expected && items.iter().all(object_response_is_valid),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_serialize_camel_case() {
        let options = ObjectDataOptions::bcs_and_display();
        let value = serde_json::to_value(options).unwrap();
        assert_eq!(value, json!({"showBcs": true, "showDisplay": true}));
    }

    #[test]
    fn test_object_response_with_data_is_valid() {
        let value = json!({
            "data": {
                "objectId": "0x2",
                "version": "5",
                "digest": "abc",
            }
        });
        assert!(object_response_is_valid(&value));
        let response: ObjectResponse = serde_json::from_value(value).unwrap();
        assert!(response.exists());
        assert_eq!(response.data.unwrap().version, "5");
    }

    #[test]
    fn test_object_response_with_error_is_valid_but_absent() {
        let value = json!({"error": {"code": "notExists", "object_id": "0x2"}});
        assert!(object_response_is_valid(&value));
        let response: ObjectResponse = serde_json::from_value(value).unwrap();
        assert!(!response.exists());
        assert_eq!(response.error.unwrap().code, "notExists");
    }

    #[test]
    fn test_empty_object_response_is_invalid() {
        assert!(!object_response_is_valid(&json!({})));
        assert!(!object_response_is_valid(&json!(null)));
    }

    #[test]
    fn test_multi_response_validity_checks_length_and_elements() {
        let good = json!([
            {"data": {"objectId": "0x1", "version": "1"}},
            {"error": {"code": "notExists"}},
        ]);
        assert!(multi_object_response_is_valid(&good, 2));
        assert!(!multi_object_response_is_valid(&good, 3));

        let bad = json!([{"data": {"objectId": "0x1", "version": "1"}}, {}]);
        assert!(!multi_object_response_is_valid(&bad, 2));
        assert!(!multi_object_response_is_valid(&json!("nope"), 1));
    }

    #[test]
    fn test_display_value_lookup() {
        let value = json!({
            "data": {
                "objectId": "0x2",
                "version": "5",
                "display": {"data": {"walrus site address": "0xabc"}, "error": null},
            }
        });
        let response: ObjectResponse = serde_json::from_value(value).unwrap();
        assert_eq!(response.display_value("walrus site address"), Some("0xabc"));
        assert_eq!(response.display_value("missing"), None);
    }

    #[test]
    fn test_bcs_decode() {
        let bcs = BcsData {
            data_type: Some("moveObject".to_string()),
            bcs_bytes: Some("AQI=".to_string()),
        };
        assert_eq!(bcs.decode().unwrap(), vec![1, 2]);
    }
}
