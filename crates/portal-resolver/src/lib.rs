//! Subdomain resolution for walrus-portal.
//!
//! A subdomain becomes a site object id through three sources, in order:
//!
//! 1. The hardcoded table from configuration. Operator-pinned names always
//!    win.
//! 2. Base36 self-encoding, only when enabled and the subdomain contains no
//!    `.` (a name-service name can therefore never be hijacked by a base36
//!    collision).
//! 3. A SuiNS name-record lookup; the record's `walrus_site_id` takes
//!    precedence over its `target_address`.

pub mod suins;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use portal_rpc::transport::RpcError;
use portal_types::encoding::base36_decode;
use portal_types::ObjectId;

pub use suins::{NameRecord, NameServiceClient, NameServiceConfig};

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The subdomain maps to nothing, anywhere.
    #[error("no object id for subdomain '{0}'")]
    NoObjectId(String),

    /// The name service could not be consulted.
    #[error("name service lookup failed")]
    FullNodeFail(#[source] RpcError),
}

/// Maps a subdomain to a site object id.
pub struct SiteResolver {
    hardcoded: HashMap<String, ObjectId>,
    b36_enabled: bool,
    name_service: Arc<NameServiceClient>,
}

impl SiteResolver {
    pub fn new(
        hardcoded: HashMap<String, ObjectId>,
        b36_enabled: bool,
        name_service: Arc<NameServiceClient>,
    ) -> Self {
        Self {
            hardcoded,
            b36_enabled,
            name_service,
        }
    }

    /// Resolve `subdomain` to a site object id.
    pub async fn resolve(&self, subdomain: &str) -> Result<ObjectId, ResolveError> {
        let subdomain = subdomain.trim().to_lowercase();

        if let Some(id) = self.hardcoded.get(&subdomain) {
            debug!(subdomain = %subdomain, site = %id, "resolved via hardcoded table");
            return Ok(*id);
        }

        // Base36 only applies to dot-free labels; decode failures fall
        // through to the name service.
        if self.b36_enabled && !subdomain.contains('.') {
            if let Ok(id) = base36_decode(&subdomain) {
                debug!(subdomain = %subdomain, site = %id, "resolved via base36 self-encoding");
                return Ok(id);
            }
        }

        match self.name_service.get_name_record(&subdomain).await {
            Ok(Some(record)) => {
                let resolved = record.walrus_site_id.or(record.target_address);
                match resolved {
                    Some(id) => {
                        debug!(subdomain = %subdomain, site = %id, "resolved via name service");
                        Ok(id)
                    }
                    None => Err(ResolveError::NoObjectId(subdomain)),
                }
            }
            Ok(None) => Err(ResolveError::NoObjectId(subdomain)),
            Err(error) => Err(ResolveError::FullNodeFail(error)),
        }
    }
}
