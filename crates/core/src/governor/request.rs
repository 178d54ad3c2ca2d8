//! Request and response types exchanged with a [`Transport`](super::Transport)

use serde_json::Value;
use url::Url;

/// Rate-limit key shared by every file and file-nodes request
pub const RESOURCE_FILES: &str = "files";
/// Rate-limit key for image render requests
pub const RESOURCE_IMAGES: &str = "images";

/// A GET request against the design API
///
/// `resource_key` selects the rate limiter, `cache_key` the cache slot. Two
/// requests with the same `cache_key` are assumed to return the same body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub resource_key: String,
    pub cache_key: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    /// Arbitrary request; the cache key defaults to `resource_key:path`
    pub fn new(resource_key: impl Into<String>, path: impl Into<String>) -> Self {
        let resource_key = resource_key.into();
        let path = path.into();
        Self { cache_key: format!("{}:{}", resource_key, path), resource_key, path, query: Vec::new() }
    }

    /// Whole document: `GET /v1/files/{file_key}`
    pub fn file(file_key: &str) -> Self {
        Self {
            resource_key: RESOURCE_FILES.to_string(),
            cache_key: format!("file:{}", file_key),
            path: format!("/v1/files/{}", file_key),
            query: Vec::new(),
        }
    }

    /// Selected subtrees: `GET /v1/files/{file_key}/nodes?ids=...`
    pub fn file_nodes<S: AsRef<str>>(file_key: &str, node_ids: &[S]) -> Self {
        let ids = join_ids(node_ids);
        Self {
            resource_key: RESOURCE_FILES.to_string(),
            cache_key: format!("file:{}:nodes:{}", file_key, ids),
            path: format!("/v1/files/{}/nodes", file_key),
            query: vec![("ids".to_string(), ids)],
        }
    }

    /// Rendered node images: `GET /v1/images/{file_key}?ids=...&format=...`
    pub fn images<S: AsRef<str>>(file_key: &str, node_ids: &[S], format: &str) -> Self {
        let ids = join_ids(node_ids);
        Self {
            resource_key: RESOURCE_IMAGES.to_string(),
            cache_key: format!("images:{}:{}:{}", file_key, format, ids),
            path: format!("/v1/images/{}", file_key),
            query: vec![("ids".to_string(), ids), ("format".to_string(), format.to_string())],
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = cache_key.into();
        self
    }
}

fn join_ids<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",")
}

/// A response as seen by the governor
///
/// Bodies that are not JSON are represented as `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, headers: Vec::new(), body }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// HTTP 429 Too Many Requests
    pub fn is_throttled(&self) -> bool {
        self.status == 429
    }

    /// First header value with this name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Header pairs as borrowed strings
    pub fn header_pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.headers.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Extract the file key from a share link
///
/// Accepts `https://www.figma.com/file/{key}/...` and
/// `https://www.figma.com/design/{key}/...`. Returns `None` for anything else.
pub fn parse_file_key(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let host = url.host_str()?;
    if host != "figma.com" && !host.ends_with(".figma.com") {
        return None;
    }

    let mut segments = url.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "file" || segment == "design" {
            return segments
                .next()
                .filter(|key| !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric()))
                .map(str::to_string);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    //! Unit tests for governor::request.
    use serde_json::json;

    use super::*;

    /// Validates `ApiRequest::file` behavior for the whole document scenario.
    ///
    /// Assertions:
    /// - Confirms the request targets the files limiter and the documented
    ///   path.
    #[test]
    fn test_file_request() {
        let request = ApiRequest::file("abc123");
        assert_eq!(request.resource_key, RESOURCE_FILES);
        assert_eq!(request.path, "/v1/files/abc123");
        assert_eq!(request.cache_key, "file:abc123");
        assert!(request.query.is_empty());
    }

    /// Validates `ApiRequest::file_nodes` behavior for the node subset
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures ids are comma joined into both the query and the cache key.
    /// - Ensures different node sets get different cache keys.
    #[test]
    fn test_file_nodes_request() {
        let request = ApiRequest::file_nodes("abc123", &["1:2", "3:4"]);
        assert_eq!(request.path, "/v1/files/abc123/nodes");
        assert_eq!(request.query, vec![("ids".to_string(), "1:2,3:4".to_string())]);
        assert_ne!(request.cache_key, ApiRequest::file_nodes("abc123", &["1:2"]).cache_key);
        assert_ne!(request.cache_key, ApiRequest::file("abc123").cache_key);
    }

    /// Validates `ApiRequest::images` behavior for the render scenario.
    ///
    /// Assertions:
    /// - Confirms image renders use their own limiter key.
    #[test]
    fn test_images_request() {
        let request = ApiRequest::images("abc123", &["1:2"], "svg");
        assert_eq!(request.resource_key, RESOURCE_IMAGES);
        assert_eq!(request.path, "/v1/images/abc123");
        assert!(request.query.contains(&("format".to_string(), "svg".to_string())));
    }

    /// Validates `ApiResponse::header` behavior for the case-insensitive
    /// lookup scenario.
    ///
    /// Assertions:
    /// - Confirms lookup ignores header name case.
    /// - Confirms status helpers classify 200 and 429.
    #[test]
    fn test_response_helpers() {
        let response = ApiResponse::new(429, json!(null)).with_header("Retry-After", "2");
        assert_eq!(response.header("retry-after"), Some("2"));
        assert!(response.is_throttled());
        assert!(!response.is_success());
        assert!(ApiResponse::new(204, Value::Null).is_success());
    }

    /// Validates `parse_file_key` behavior for the share link scenario.
    ///
    /// Assertions:
    /// - Confirms both `/file/` and `/design/` links yield the key.
    /// - Confirms other hosts and malformed links yield `None`.
    #[test]
    fn test_parse_file_key() {
        assert_eq!(
            parse_file_key("https://www.figma.com/file/AbC123xyz/My-Design?node-id=1-2"),
            Some("AbC123xyz".to_string())
        );
        assert_eq!(
            parse_file_key("https://figma.com/design/Key42/Title"),
            Some("Key42".to_string())
        );
        assert_eq!(parse_file_key("https://example.com/file/AbC123/x"), None);
        assert_eq!(parse_file_key("https://www.figma.com/community/plugin/1"), None);
        assert_eq!(parse_file_key("https://www.figma.com/file/"), None);
        assert_eq!(parse_file_key("not a url"), None);
    }
}
