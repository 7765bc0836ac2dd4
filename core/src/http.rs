//! HTTP request/response descriptors exchanged with the transport.
//!
//! # Design
//! Requests and responses are plain data. The core builds `HttpRequest`
//! values and decodes `HttpResponse` values; the `Transport` implementation
//! supplied by the caller is the only thing that touches the network.
//!
//! Headers are kept as ordered `(name, value)` pairs so that the request
//! descriptor is deterministic and easy to compare in tests.

use std::fmt;

use serde_json::Value;

/// HTTP method used by the dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// Built fresh for every call by `build_request`. The transport executes it
/// and hands back the corresponding `HttpResponse`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup. Returns the last value set for `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response with its body already parsed as JSON.
///
/// Header names are matched case-insensitively, so transports may report
/// them in whatever case the server used.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub headers: Vec<(String, String)>,
    pub json: Value,
}

impl HttpResponse {
    pub fn new(headers: Vec<(String, String)>, json: Value) -> Self {
        Self { headers, json }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .rev()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
