//! The portal's HTTP response model.
//!
//! Deliberately framework-free: the front end converts [`PortalResponse`]
//! into whatever its server type is, and the cache stores clones of it.
//! Telemetry headers carry the chain coordinates the cache validates
//! against.

/// Resource object id the body was served from.
pub const X_RESOURCE_OBJECT_ID: &str = "x-resource-sui-object-id";

/// On-chain version of that resource object at serve time.
pub const X_RESOURCE_OBJECT_VERSION: &str = "x-resource-sui-object-version";

/// Wall-clock milliseconds when the response entered the cache.
pub const X_UNIX_TIME_CACHED: &str = "x-unix-time-cached";

/// A fully materialized response: status, ordered headers, body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl PortalResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace or append a header.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value.into(),
            None => self.headers.push((name.to_string(), value.into())),
        }
    }

    /// Approximate memory footprint, used for cache quota accounting.
    pub fn weight(&self) -> usize {
        self.body.len()
            + self
                .headers
                .iter()
                .map(|(n, v)| n.len() + v.len())
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = PortalResponse::new(200).with_header("Content-Type", "text/html");
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/html"));
        assert_eq!(response.header("x-missing"), None);
    }

    #[test]
    fn test_set_header_replaces_existing() {
        let mut response = PortalResponse::new(200).with_header("a", "1");
        response.set_header("A", "2");
        assert_eq!(response.header("a"), Some("2"));
        assert_eq!(response.headers.len(), 1);
        response.set_header("b", "3");
        assert_eq!(response.headers.len(), 2);
    }

    #[test]
    fn test_weight_counts_headers_and_body() {
        let response = PortalResponse::new(200)
            .with_header("ab", "cd")
            .with_body(vec![0u8; 10]);
        assert_eq!(response.weight(), 14);
    }
}
