//! Host parsing, path normalization, and synthetic link handling.
//!
//! Two synthetic URL shapes are recognized before normal resolution:
//!
//! - `https://<subdomain>.suiobj.invalid/<path>` redirects to the same
//!   site under this portal's domain
//! - `https://blobid.walrus.invalid/<blob_id>` redirects to the blob on
//!   the aggregator
//!
//! Host splitting is configuration-driven: the portal's own domain is
//! matched first; `portal_domain_name_length` covers TLDs that are not on
//! the public suffix list; `bring_your_own_domain` treats the whole host
//! as the name to resolve.

/// Suffix of the site-redirect synthetic host.
pub const SUIOBJ_SUFFIX: &str = ".suiobj.invalid";

/// Host of the blob-redirect synthetic URL.
pub const BLOBID_HOST: &str = "blobid.walrus.invalid";

/// The resolved pieces of an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainDetails {
    pub subdomain: String,
    pub path: String,
}

/// A recognized synthetic link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticRedirect {
    /// Redirect to `https://<subdomain>.<portal-domain><path>`.
    Site { subdomain: String, path: String },
    /// Redirect to the aggregator URL of this blob.
    Blob { blob_id: String },
}

/// How hosts are split into `(subdomain, domain)`.
#[derive(Debug, Clone, Default)]
pub struct DomainSplit {
    /// The portal's own registrable domain, e.g. `portal.example`.
    pub portal_domain: Option<String>,
    /// Number of labels forming the registrable domain, for TLDs the
    /// public suffix list does not cover.
    pub domain_name_length: Option<usize>,
    /// The entire host is the name to resolve.
    pub bring_your_own_domain: bool,
}

impl DomainSplit {
    /// Extract the subdomain to resolve from an inbound `Host` value.
    /// Returns `None` when the host is the bare portal domain.
    pub fn subdomain_of(&self, host: &str) -> Option<String> {
        let host = strip_port(host).to_lowercase();

        if self.bring_your_own_domain {
            return Some(host);
        }

        if let Some(portal_domain) = &self.portal_domain {
            let portal_domain = portal_domain.to_lowercase();
            if host == portal_domain {
                return None;
            }
            if let Some(prefix) = host.strip_suffix(&format!(".{portal_domain}")) {
                return Some(prefix.to_string());
            }
        }

        let labels: Vec<&str> = host.split('.').collect();
        // Registrable-domain label count; two covers `example.com`-style
        // hosts when no override is configured.
        let domain_labels = self.domain_name_length.unwrap_or(2);
        if labels.len() <= domain_labels {
            return None;
        }
        Some(labels[..labels.len() - domain_labels].join("."))
    }
}

/// Strip a `:port` suffix from a Host header value.
fn strip_port(host: &str) -> &str {
    host.rsplit_once(':')
        .map(|(h, port)| {
            if port.chars().all(|c| c.is_ascii_digit()) {
                h
            } else {
                host
            }
        })
        .unwrap_or(host)
}

/// Normalize a request path to the form resources are stored under:
/// directory paths gain `index.html`, and the query string is dropped.
pub fn normalize_path(path: &str) -> String {
    let path = path.split('?').next().unwrap_or(path);
    let path = if path.is_empty() || !path.starts_with('/') {
        format!("/{path}")
    } else {
        path.to_string()
    };
    if path.ends_with('/') {
        format!("{path}index.html")
    } else {
        path
    }
}

/// Recognize the synthetic shapes from an inbound host and path.
pub fn parse_synthetic_request(host: &str, path: &str) -> Option<SyntheticRedirect> {
    let host = strip_port(host).to_lowercase();
    if let Some(subdomain) = host.strip_suffix(SUIOBJ_SUFFIX) {
        return Some(SyntheticRedirect::Site {
            subdomain: subdomain.to_string(),
            path: path.to_string(),
        });
    }
    if host == BLOBID_HOST {
        let blob_id = path.trim_start_matches('/');
        if !blob_id.is_empty() {
            return Some(SyntheticRedirect::Blob {
                blob_id: blob_id.to_string(),
            });
        }
    }
    None
}
