//! HTTP message types
//!
//! This module defines the request context handed to user handlers and the
//! response they populate, together with the method and status primitives.

use super::{Error, Headers, Result};
use std::fmt;

/// HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
}

impl Method {
    /// Parse method from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "CONNECT" => Ok(Method::Connect),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            "PATCH" => Ok(Method::Patch),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }

    /// Convert method to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status {
    code: u16,
}

impl Status {
    /// 200 OK
    pub const OK: Status = Status { code: 200 };
    /// 400 Bad Request
    pub const BAD_REQUEST: Status = Status { code: 400 };
    /// 404 Not Found
    pub const NOT_FOUND: Status = Status { code: 404 };
    /// 500 Internal Server Error
    pub const INTERNAL_SERVER_ERROR: Status = Status { code: 500 };

    /// Create a new status code
    pub fn new(code: u16) -> Result<Self> {
        if (100..600).contains(&code) {
            Ok(Status { code })
        } else {
            Err(Error::InvalidStatus(format!("Invalid status code: {}", code)))
        }
    }

    /// Get the status code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Check if status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Check if status is 4xx
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code)
    }

    /// Check if status is 5xx
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::OK
    }
}

/// Request context handed to the user handler
///
/// Materialized by the HTTP/2 engine from a completed request stream: the
/// pseudo-headers become dedicated fields, the remaining header fields land
/// in `headers`, and the accumulated DATA payload becomes `body`. The handler
/// writes its output into the embedded [`Response`].
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    path: String,
    scheme: String,
    authority: String,
    headers: Headers,
    body: Vec<u8>,
    stream_id: u32,
    response: Response,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(
        method: Method,
        path: impl Into<String>,
        scheme: impl Into<String>,
        authority: impl Into<String>,
        headers: Headers,
        body: Vec<u8>,
        stream_id: u32,
    ) -> Self {
        RequestContext {
            method,
            path: path.into(),
            scheme: scheme.into(),
            authority: authority.into(),
            headers,
            body,
            stream_id,
            response: Response::new(),
        }
    }

    /// Get the request method
    pub fn method(&self) -> Method {
        self.method
    }

    /// Get the request path (including any query string)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the request scheme
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Get the request authority (host:port)
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Get the request headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get the first value of a request header (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Get the request body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get the request body as a string
    pub fn body_string(&self) -> Result<String> {
        String::from_utf8(self.body.clone())
            .map_err(|e| Error::Protocol(format!("Invalid UTF-8 in body: {}", e)))
    }

    /// Get the stream id this request arrived on
    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    /// Get the response
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Get the mutable response the handler populates
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Take the response out of the context
    pub fn take_response(self) -> Response {
        self.response
    }
}

/// HTTP response populated by the user handler
#[derive(Debug, Default)]
pub struct Response {
    status: Status,
    headers: Headers,
    body: Vec<u8>,
}

impl Response {
    /// Create a new empty response with status 200
    pub fn new() -> Self {
        Response::default()
    }

    /// Get the response status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Set the response status
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// Get the response headers
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get the mutable response headers
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Add a response header
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Get the response body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Set the response body
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_roundtrip() {
        for m in ["GET", "HEAD", "POST", "PUT", "DELETE", "OPTIONS", "PATCH"] {
            assert_eq!(Method::from_str(m).unwrap().as_str(), m);
        }
        assert!(Method::from_str("BREW").is_err());
    }

    #[test]
    fn test_status() {
        let status = Status::new(200).unwrap();
        assert_eq!(status.code(), 200);
        assert!(status.is_success());

        assert!(Status::new(99).is_err());
        assert!(Status::new(600).is_err());
        assert!(Status::NOT_FOUND.is_client_error());
        assert!(Status::INTERNAL_SERVER_ERROR.is_server_error());
    }

    #[test]
    fn test_request_context_accessors() {
        let mut headers = Headers::new();
        headers.insert("content-type", "application/json");

        let ctx = RequestContext::new(
            Method::Post,
            "/api/v1/data",
            "https",
            "example.com:443",
            headers,
            br#"{"test":"data"}"#.to_vec(),
            1,
        );

        assert_eq!(ctx.method(), Method::Post);
        assert_eq!(ctx.path(), "/api/v1/data");
        assert_eq!(ctx.scheme(), "https");
        assert_eq!(ctx.authority(), "example.com:443");
        assert_eq!(ctx.header("content-type"), Some("application/json"));
        assert_eq!(ctx.header("nonexistent"), None);
        assert_eq!(ctx.body(), br#"{"test":"data"}"#);
        assert_eq!(ctx.body_string().unwrap(), r#"{"test":"data"}"#);
        assert_eq!(ctx.stream_id(), 1);
    }

    #[test]
    fn test_response_mutation() {
        let mut ctx = RequestContext::new(
            Method::Get,
            "/",
            "https",
            "localhost",
            Headers::new(),
            Vec::new(),
            1,
        );

        let resp = ctx.response_mut();
        resp.set_status(Status::NOT_FOUND);
        resp.header("content-type", "text/plain");
        resp.set_body(&b"nope"[..]);

        assert_eq!(ctx.response().status().code(), 404);
        assert_eq!(ctx.response().headers().get("content-type"), Some("text/plain"));
        assert_eq!(ctx.response().body(), b"nope");
    }

    #[test]
    fn test_body_string_invalid_utf8() {
        let ctx = RequestContext::new(
            Method::Post,
            "/data",
            "https",
            "example.com",
            Headers::new(),
            vec![0xFF, 0xFE, 0xFD],
            13,
        );
        assert!(ctx.body_string().is_err());
    }
}
