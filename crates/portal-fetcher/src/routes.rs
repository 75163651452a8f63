//! The site routes table: loading and matching.
//!
//! Routes live in a fixed dynamic field keyed by the byte string
//! `b"routes"` under the key type `vector<u8>`. A missing routes object is
//! a legal "no routes" answer, not an error.

use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use portal_rpc::types::ObjectDataOptions;
use portal_rpc::RpcSelector;
use portal_types::site::{RoutesData, ROUTES_FIELD_KEY};
use portal_types::{derive_dynamic_field_id, ObjectId, TypeTag};

use crate::FetchError;

/// An ordered routes table, pattern → target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routes(pub Vec<(String, String)>);

impl Routes {
    /// Match `path` against the table.
    ///
    /// Every entry whose `^pattern$` regex (with `*` expanded to `.*`)
    /// matches is a candidate; the longest pattern wins and ties keep the
    /// first-inserted entry. An empty table matches nothing.
    pub fn match_path(&self, path: &str) -> Option<&str> {
        let mut best: Option<(&str, &str)> = None;
        for (pattern, target) in &self.0 {
            let regex_src = format!("^{}$", pattern.replace('*', ".*"));
            let Ok(re) = Regex::new(&regex_src) else {
                debug!(pattern = %pattern, "skipping unparseable route pattern");
                continue;
            };
            if !re.is_match(path) {
                continue;
            }
            match best {
                Some((current, _)) if pattern.len() <= current.len() => {}
                _ => best = Some((pattern, target)),
            }
        }
        best.map(|(_, target)| target)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Loads a site's routes table through the shared selector.
pub struct RoutesFetcher {
    selector: Arc<RpcSelector>,
}

impl RoutesFetcher {
    pub fn new(selector: Arc<RpcSelector>) -> Self {
        Self { selector }
    }

    /// Derive the routes field's object id for `site`. Pure function.
    pub fn derive_routes_id(site: ObjectId) -> Result<ObjectId, FetchError> {
        let key = bcs::to_bytes(&ROUTES_FIELD_KEY.to_vec())
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        derive_dynamic_field_id(site, &TypeTag::vector_u8(), &key)
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }

    /// Fetch the routes table for `site`; `Ok(None)` when the site has no
    /// routes object.
    pub async fn load(&self, site: ObjectId) -> Result<Option<Routes>, FetchError> {
        let field_id = Self::derive_routes_id(site)?;
        let response = self
            .selector
            .get_object(&field_id, &ObjectDataOptions::bcs_only())
            .await?;

        let Some(data) = response.data else {
            return Ok(None);
        };
        let payload = data
            .bcs
            .as_ref()
            .ok_or_else(|| FetchError::Malformed("routes object missing bcs".to_string()))?
            .decode()
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        let field: RoutesData = bcs::from_bytes(&payload)
            .map_err(|e| FetchError::Malformed(format!("routes field: {e}")))?;

        let routes = Routes(
            field
                .value
                .iter()
                .map(|(pattern, target)| (pattern.clone(), target.clone()))
                .collect(),
        );
        debug!(site = %site, entries = routes.0.len(), "routes table loaded");
        Ok(Some(routes))
    }
}
