//! Built-in response pages and redirect builders.
//!
//! These are intentionally small inline HTML bodies; rich error-page
//! templating belongs to the front end, not the core.

use portal_types::PortalResponse;

const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

fn html_page(status: u16, title: &str, message: &str) -> PortalResponse {
    let body = format!(
        "<!doctype html><html><head><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{message}</p></body></html>"
    );
    PortalResponse::new(status)
        .with_header("content-type", CONTENT_TYPE_HTML)
        .with_body(body.into_bytes())
}

/// The shared 404 page. Blocked sites use the same constructor so the two
/// responses are byte-identical and the blocklist cannot be probed.
pub fn site_not_found() -> PortalResponse {
    html_page(
        404,
        "Walrus Site not found",
        "The requested Walrus Site could not be found on this portal.",
    )
}

pub fn hash_mismatch() -> PortalResponse {
    html_page(
        422,
        "Checksum mismatch",
        "The aggregator returned a blob whose hash does not match the on-chain record.",
    )
}

pub fn upstream_unavailable() -> PortalResponse {
    html_page(
        503,
        "Upstream unavailable",
        "No Sui full node is currently reachable; please retry shortly.",
    )
}

pub fn internal_error() -> PortalResponse {
    html_page(500, "Internal error", "Something went wrong serving this site.")
}

/// A 302 redirect with an empty body.
pub fn redirect(location: &str) -> PortalResponse {
    PortalResponse::new(302).with_header("location", location)
}
