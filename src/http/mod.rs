//! HTTP/1.x message types and the connection framer.
//!
//! This module provides the core HTTP primitives:
//! [`Method`], [`Status`], [`Headers`], [`Request`], [`Response`], and the
//! [`framer`] that reads one request from a stream and writes one response.

use std::borrow::Cow;
use std::fmt;

pub mod framer;
pub mod headers;
pub mod request;
pub mod response;

pub use framer::{
    FrameError, Handler, HandlerError, HandlerFuture, handle, handle_with_limits, handler_fn,
};
pub use headers::Headers;
pub use request::{Body, Request};
pub use response::{Response, ResponseBody};

/// An HTTP response status: numeric code plus reason phrase.
///
/// The phrase defaults to the canonical one for well-known codes and to the
/// decimal code itself for anything else.
///
/// # Examples
///
/// ```
/// use ringhttp::http::Status;
///
/// assert_eq!(Status::new(404).reason(), "Not Found");
/// assert_eq!(Status::new(299).reason(), "299");
/// assert_eq!(Status::OK.to_string(), "200 OK");
/// assert_eq!(Status::with_reason(200, "Fine").reason(), "Fine");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Status {
    code: u16,
    reason: Cow<'static, str>,
}

impl Status {
    pub const OK: Status = Status::from_static(200, "OK");
    pub const NO_CONTENT: Status = Status::from_static(204, "No Content");
    pub const NOT_FOUND: Status = Status::from_static(404, "Not Found");
    pub const METHOD_NOT_ALLOWED: Status = Status::from_static(405, "Method Not Allowed");
    pub const URI_TOO_LONG: Status = Status::from_static(414, "URI Too Long");
    pub const REQUEST_HEADER_FIELDS_TOO_LARGE: Status =
        Status::from_static(431, "Request Header Fields Too Large");
    pub const INTERNAL_SERVER_ERROR: Status = Status::from_static(500, "Internal Server Error");

    const fn from_static(code: u16, reason: &'static str) -> Self {
        Self {
            code,
            reason: Cow::Borrowed(reason),
        }
    }

    /// Creates a status with the default reason phrase for `code`.
    pub fn new(code: u16) -> Self {
        let reason = match canonical_reason(code) {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(code.to_string()),
        };
        Self { code, reason }
    }

    /// Creates a status with a custom reason phrase.
    pub fn with_reason(code: u16, reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

}

impl Default for Status {
    fn default() -> Self {
        Self::OK
    }
}

impl From<u16> for Status {
    fn from(code: u16) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}

/// Canonical reason phrase for a status code, if it is one we know.
pub fn canonical_reason(code: u16) -> Option<&'static str> {
    Some(match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return None,
    })
}

/// An HTTP request method.
///
/// Standard methods are unit variants; anything else is kept verbatim in
/// `Custom`, so the method token of a request line always round-trips.
///
/// # Examples
///
/// ```
/// use ringhttp::http::Method;
///
/// let method: Method = "GET".parse().unwrap();
/// assert_eq!(method, Method::Get);
/// assert_eq!("BREW".parse::<Method>().unwrap().as_str(), "BREW");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Connect,
    Trace,
    /// A non-standard extension method.
    Custom(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Connect => "CONNECT",
            Self::Trace => "TRACE",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "PATCH" => Self::Patch,
            "CONNECT" => Self::Connect,
            "TRACE" => Self::Trace,
            other => Self::Custom(other.to_owned()),
        })
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(method) => method,
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reason_table() {
        assert_eq!(Status::new(200), Status::OK);
        assert_eq!(Status::new(500), Status::INTERNAL_SERVER_ERROR);
        assert_eq!(Status::new(431).reason(), "Request Header Fields Too Large");
        assert_eq!(Status::new(799).reason(), "799");
        assert_eq!(Status::new(404), Status::NOT_FOUND);
        assert_eq!(Status::new(405), Status::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn custom_method_round_trips() {
        assert_eq!(Method::from("PURGE"), Method::Custom("PURGE".into()));
        assert_eq!(Method::from("DELETE").to_string(), "DELETE");
    }
}
