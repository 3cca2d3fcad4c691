//! Parsed HTTP request.

use std::fmt;

use super::{Headers, Method};
use crate::io::{AsyncReadable, BoundedReader};

/// Version assumed when the request line does not carry one.
pub const DEFAULT_VERSION: &str = "HTTP/1.0";

/// Request body: a reader bounded by the request's `Content-Length` over the
/// connection's buffered stream.
pub type Body<'a> = BoundedReader<dyn AsyncReadable + 'a>;

/// An HTTP request as read from the connection.
///
/// Everything except the body is parsed eagerly. The body is streamed on
/// demand from the connection and can never yield more than the declared
/// `Content-Length`.
///
/// The request line is split on the first two spaces only, so the path may
/// be missing (empty) and the version defaults to [`DEFAULT_VERSION`].
pub struct Request<'a> {
    line: String,
    method: Method,
    path: String,
    version: String,
    headers: Headers,
    body: &'a mut Body<'a>,
}

impl<'a> Request<'a> {
    /// Builds a request from its raw start line, parsed headers and body.
    ///
    /// Trailing `\r` / `\n` on `line` are ignored.
    pub fn new(line: &str, headers: Headers, body: &'a mut Body<'a>) -> Self {
        let line = line.trim_end_matches(['\r', '\n']).to_owned();
        let mut parts = line.splitn(3, ' ');
        let method = Method::from(parts.next().unwrap_or(""));
        let path = parts.next().unwrap_or("").to_owned();
        let version = parts
            .next()
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_VERSION)
            .to_owned();

        Self {
            line,
            method,
            path,
            version,
            headers,
            body,
        }
    }

    /// The start line exactly as received, without its terminator.
    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The raw request target, including any query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The part of the target after the first `?`, if any.
    pub fn query_string(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, q)| q)
    }

    /// Protocol version token, e.g. `HTTP/1.1`.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Declared body length.
    pub fn content_length(&self) -> u64 {
        self.body.limit()
    }

    /// The body reader.
    pub fn body(&mut self) -> &mut Body<'a> {
        &mut *self.body
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("content_length", &self.body.limit())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BufferedStreamReader;

    #[test]
    fn parse_full_request_line() {
        let mut body = BoundedReader::new(BufferedStreamReader::new(&b""[..]), 0);
        let req = Request::new("GET /search?q=rust HTTP/1.1\r\n", Headers::new(), &mut body);
        assert_eq!(req.method(), &Method::Get);
        assert_eq!(req.path(), "/search?q=rust");
        assert_eq!(req.query_string(), Some("q=rust"));
        assert_eq!(req.version(), "HTTP/1.1");
        assert_eq!(req.line(), "GET /search?q=rust HTTP/1.1");
    }

    #[test]
    fn missing_parts_use_fallbacks() {
        let mut body = BoundedReader::new(BufferedStreamReader::new(&b""[..]), 0);
        let req = Request::new("GET /\r\n", Headers::new(), &mut body);
        assert_eq!(req.path(), "/");
        assert_eq!(req.version(), DEFAULT_VERSION);

        let mut body = BoundedReader::new(BufferedStreamReader::new(&b""[..]), 0);
        let req = Request::new("PURGE\n", Headers::new(), &mut body);
        assert_eq!(req.method().as_str(), "PURGE");
        assert_eq!(req.path(), "");
        assert_eq!(req.version(), DEFAULT_VERSION);
    }

    #[test]
    fn only_two_splits() {
        let mut body = BoundedReader::new(BufferedStreamReader::new(&b""[..]), 0);
        let req = Request::new("GET /a b HTTP/1.1", Headers::new(), &mut body);
        assert_eq!(req.path(), "/a");
        assert_eq!(req.version(), "b HTTP/1.1");
    }

    #[tokio::test]
    async fn body_is_bounded() {
        let mut body = BoundedReader::new(BufferedStreamReader::new(&b"hello!extra"[..]), 6);
        let mut headers = Headers::new();
        headers.insert("Content-Length", "6");
        let mut req = Request::new("POST /upload HTTP/1.1", headers, &mut body);
        assert_eq!(req.content_length(), 6);
        assert_eq!(&req.body().read_to_end().await.unwrap()[..], b"hello!");
    }
}
