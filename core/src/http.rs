//! Plain-data HTTP types exchanged with a [`Transport`](crate::transport::Transport).
//!
//! # Design
//! The core builds `WireRequest` values and consumes `WireResponse` values.
//! Everything between the two (sockets, TLS, redirects) belongs to the
//! transport. A response without a status code models a reply that is not
//! a real HTTP response, which classification reports as
//! [`RequestError::UnknownResponse`](crate::error::RequestError::UnknownResponse).

use std::collections::BTreeMap;
use std::fmt;

use url::Url;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Uppercase method name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flattened header fields, one value per key.
pub type HeaderMap = BTreeMap<String, String>;

/// An HTTP request described as plain data.
///
/// Built by [`Request::to_wire_request`](crate::request::Request::to_wire_request)
/// and handed to a transport for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireResponse {
    /// `None` when the transport produced something that is not an HTTP response.
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(status),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A reply carrying bytes but no HTTP status.
    pub fn without_status(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: None,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}
