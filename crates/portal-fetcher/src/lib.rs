//! Resource fetching against on-chain site state.
//!
//! Given a site object id and a path, the fetcher derives the resource's
//! dynamic-field object id locally, pulls the site object and the field
//! object in one ordered batch, follows display-field redirects, and
//! decodes the field's BCS payload into a [`VersionedResource`].
//!
//! Redirect chains are bounded two ways: a hop budget of
//! [`MAX_REDIRECT_DEPTH`] and a per-request visited set. Both make the
//! number of RPC calls per request bounded no matter how a site is
//! misconfigured.

pub mod routes;

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use portal_rpc::transport::RpcError;
use portal_rpc::types::ObjectDataOptions;
use portal_rpc::RpcSelector;
use portal_types::site::{ResourceField, ResourcePath};
use portal_types::type_tag::StructTag;
use portal_types::{derive_dynamic_field_id, ObjectId, TypeTag, VersionedResource};

pub use routes::{Routes, RoutesFetcher};

/// Maximum number of display-field redirect hops per request.
pub const MAX_REDIRECT_DEPTH: usize = 3;

/// Display-record key whose value redirects to another site object.
pub const DISPLAY_REDIRECT_KEY: &str = "walrus site address";

#[derive(Debug, Error)]
pub enum FetchError {
    /// The redirect chain revisited a site (internal status 508).
    #[error("redirect loop detected at site {0}")]
    LoopDetected(ObjectId),

    /// The redirect chain exceeded the hop budget (internal status 310).
    #[error("redirect chain exceeded {MAX_REDIRECT_DEPTH} hops")]
    TooManyRedirects,

    /// The chain handed back bytes that do not decode as a resource.
    #[error("malformed on-chain payload: {0}")]
    Malformed(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// The dynamic-field key type of site resources:
/// `<site_package>::site::ResourcePath`.
pub fn resource_path_tag(site_package: ObjectId) -> TypeTag {
    TypeTag::Struct(Box::new(StructTag::new(site_package, "site", "ResourcePath")))
}

/// Derive the object id of the resource field for `path` under `site`.
/// Pure function of its inputs.
pub fn derive_resource_id(
    site_package: ObjectId,
    site: ObjectId,
    path: &str,
) -> Result<ObjectId, FetchError> {
    let key = bcs::to_bytes(&ResourcePath {
        path: path.to_string(),
    })
    .map_err(|e| FetchError::Malformed(e.to_string()))?;
    derive_dynamic_field_id(site, &resource_path_tag(site_package), &key)
        .map_err(|e| FetchError::Malformed(e.to_string()))
}

/// Fetches resource descriptors from site objects.
pub struct ResourceFetcher {
    selector: Arc<RpcSelector>,
    site_package: ObjectId,
}

impl ResourceFetcher {
    pub fn new(selector: Arc<RpcSelector>, site_package: ObjectId) -> Self {
        Self {
            selector,
            site_package,
        }
    }

    pub fn selector(&self) -> &Arc<RpcSelector> {
        &self.selector
    }

    /// Derive the resource field's object id without any RPC.
    pub fn derive_resource_id(&self, site: ObjectId, path: &str) -> Result<ObjectId, FetchError> {
        derive_resource_id(self.site_package, site, path)
    }

    /// Fetch the resource stored at `path` under `site`.
    ///
    /// `Ok(None)` is the normal "no such resource" answer and triggers
    /// routes fallback in the orchestrator. Loop and depth violations are
    /// errors; they describe a broken site, not a missing page.
    pub async fn fetch_resource(
        &self,
        site: ObjectId,
        path: &str,
        visited: &mut HashSet<ObjectId>,
        depth: usize,
    ) -> Result<Option<VersionedResource>, FetchError> {
        if visited.contains(&site) {
            return Err(FetchError::LoopDetected(site));
        }
        if depth >= MAX_REDIRECT_DEPTH {
            return Err(FetchError::TooManyRedirects);
        }

        let field_id = self.derive_resource_id(site, path)?;
        let responses = self
            .selector
            .multi_get_objects(&[site, field_id], &ObjectDataOptions::bcs_and_display())
            .await?;
        visited.insert(site);

        // Ordering is preserved by the batch call: [site, field].
        let site_response = &responses[0];
        if let Some(address) = site_response.display_value(DISPLAY_REDIRECT_KEY) {
            if let Ok(redirect) = ObjectId::from_hex_literal(address) {
                debug!(site = %site, redirect = %redirect, depth, "following display redirect");
                return Box::pin(self.fetch_resource(redirect, path, visited, depth + 1)).await;
            }
        }

        let Some(field_data) = &responses[1].data else {
            return Ok(None);
        };
        let bcs_payload = field_data
            .bcs
            .as_ref()
            .ok_or_else(|| FetchError::Malformed("resource object missing bcs".to_string()))?
            .decode()
            .map_err(|e| FetchError::Malformed(e.to_string()))?;
        let field: ResourceField = bcs::from_bytes(&bcs_payload)
            .map_err(|e| FetchError::Malformed(format!("resource field: {e}")))?;

        debug!(site = %site, path, field = %field_id, "resource fetched");
        Ok(Some(VersionedResource {
            resource: field.value,
            object_id: field_id,
            version: field_data.version.clone(),
        }))
    }
}
