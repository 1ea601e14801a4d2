//! Transport-neutral request and response types.
//!
//! The HTTP front end converts its requests into [`RequestDescriptor`] and
//! copies a [`BufferedResponse`] back out, so the manager never sees the
//! server library.

use std::io::{self, Write};

use percent_encoding::percent_decode_str;

/// What the manager needs to know about an incoming request.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    path: String,
    query: Vec<(String, String)>,
    accepts_gzip: bool,
}

impl RequestDescriptor {
    /// Parse a request target (`/wro/all.js?minimize=false`).
    ///
    /// The path is percent-decoded; query pairs are form-decoded.
    pub fn parse(target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let path = percent_decode_str(path).decode_utf8_lossy().into_owned();
        let query = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self {
            path,
            query,
            accepts_gzip: false,
        }
    }

    /// Mark whether the client sent `Accept-Encoding: gzip`.
    pub fn with_accepts_gzip(mut self, accepts: bool) -> Self {
        self.accepts_gzip = accepts;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// First value of query parameter `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn accepts_gzip(&self) -> bool {
        self.accepts_gzip
    }

    /// Check whether `marker` is one of the path segments.
    pub fn has_segment(&self, marker: &str) -> bool {
        self.path.split('/').any(|s| s == marker)
    }
}

/// Where the manager writes a response.
pub trait ResponseSink {
    fn set_content_type(&mut self, value: &str);
    fn set_header(&mut self, name: &str, value: &str);
    fn body(&mut self) -> &mut dyn Write;
}

/// In-memory [`ResponseSink`].
#[derive(Debug, Default)]
pub struct BufferedResponse {
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Header value, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn into_parts(self) -> (Option<String>, Vec<(String, String)>, Vec<u8>) {
        (self.content_type, self.headers, self.body)
    }
}

impl ResponseSink for BufferedResponse {
    fn set_content_type(&mut self, value: &str) {
        self.content_type = Some(value.to_string());
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    fn body(&mut self) -> &mut dyn Write {
        &mut self.body
    }
}

/// Copy `bytes` into a sink body.
pub(crate) fn write_all(sink: &mut dyn ResponseSink, bytes: &[u8]) -> io::Result<()> {
    let body = sink.body();
    body.write_all(bytes)?;
    body.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_and_query() {
        let req = RequestDescriptor::parse("/wro/all%20in.js?minimize=false&id=img%2Fa.png");
        assert_eq!(req.path(), "/wro/all in.js");
        assert_eq!(req.param("minimize"), Some("false"));
        assert_eq!(req.param("id"), Some("img/a.png"));
        assert_eq!(req.param("missing"), None);
        assert!(!req.accepts_gzip());
    }

    #[test]
    fn test_has_segment() {
        let req = RequestDescriptor::parse("/wro/wroAPI/reloadCache");
        assert!(req.has_segment("wroAPI"));
        assert!(req.has_segment("reloadCache"));
        assert!(!req.has_segment("wroapi"));
        assert!(!req.has_segment("reload"));
    }

    #[test]
    fn test_buffered_headers_replace() {
        let mut res = BufferedResponse::new();
        res.set_header("ETag", "a");
        res.set_header("etag", "b");
        assert_eq!(res.header("ETAG"), Some("b"));
        assert_eq!(res.headers().len(), 1);
    }

    #[test]
    fn test_buffered_body() {
        let mut res = BufferedResponse::new();
        res.set_content_type("text/css");
        write_all(&mut res, b"body{}").unwrap();
        assert_eq!(res.content_type(), Some("text/css"));
        assert_eq!(res.body_bytes(), b"body{}");
    }
}
