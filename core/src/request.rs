//! Immutable request descriptions and URL assembly.
//!
//! # Design
//! `Request` is a value: every transform (`appending`, `replacing`,
//! `with_header`, `with_body`) returns a new request and leaves the
//! original untouched. URL assembly is synchronous and fails with
//! `InvalidUrlFormat` before anything is handed to a transport.

use std::fmt;
use std::sync::Arc;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::{Host, Url};

use crate::endpoint::{BaseUrl, Endpoint};
use crate::error::RequestError;
use crate::header::{header_map, HeaderField, SharedHeader};
use crate::http::{HttpMethod, WireRequest};
use crate::query::{QueryParameter, QueryParameters};

/// Everything except RFC 3986 unreserved characters is escaped, so a
/// literal `%` becomes `%25` and a space becomes `%20`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// Description of one HTTP call.
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpMethod,
    endpoint: Endpoint,
    query_parameters: QueryParameters,
    headers: Vec<SharedHeader>,
    body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: HttpMethod, endpoint: Endpoint) -> Self {
        Self {
            method,
            endpoint,
            query_parameters: QueryParameters::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Rebuild a request from an absolute URL.
    ///
    /// The base URL is secure iff the scheme is `https`. Returns `None` when
    /// the URL has no host.
    pub fn from_url(method: HttpMethod, url: &Url) -> Option<Self> {
        let host = url.host_str()?;
        let mut base_url = BaseUrl::new(host).with_secure(url.scheme() == "https");
        if let Some(port) = url.port() {
            base_url = base_url.with_port(port);
        }
        let query = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()));

        Some(Self {
            query_parameters: QueryParameters::from_query_items(query),
            ..Self::new(method, Endpoint::new(base_url, &percent_decode_str(url.path()).decode_utf8_lossy()))
        })
    }

    /// Parse `url` and rebuild a request from it. `None` if it does not
    /// parse or has no host.
    pub fn parse(method: HttpMethod, url: &str) -> Option<Self> {
        let url = Url::parse(url).ok()?;
        Self::from_url(method, &url)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn query_parameters(&self) -> &QueryParameters {
        &self.query_parameters
    }

    pub fn headers(&self) -> &[SharedHeader] {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Wire query items, in insertion order.
    pub fn query_items(&self) -> Vec<(String, String)> {
        self.query_parameters.to_query_items()
    }

    /// Copy with `parameters` merged in; same-key entries are overwritten.
    pub fn appending<I>(&self, parameters: I) -> Self
    where
        I: IntoIterator<Item = QueryParameter>,
    {
        let mut request = self.clone();
        request.query_parameters.merge(parameters);
        request
    }

    /// Copy whose parameters are exactly `parameters`.
    pub fn replacing<I>(&self, parameters: I) -> Self
    where
        I: IntoIterator<Item = QueryParameter>,
    {
        Self {
            query_parameters: parameters.into_iter().collect(),
            ..self.clone()
        }
    }

    pub fn with_header<H>(mut self, header: H) -> Self
    where
        H: HeaderField + 'static,
    {
        self.headers.push(Arc::new(header));
        self
    }

    pub fn with_headers<I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = SharedHeader>,
    {
        self.headers.extend(headers);
        self
    }

    pub fn with_body(mut self, body: Option<Vec<u8>>) -> Self {
        self.body = body;
        self
    }

    /// Assemble `scheme://host[:port]/path?query`.
    ///
    /// Path segments and query items are percent-encoded here, so the
    /// endpoint holds them unescaped. `.` and `..` segments are resolved the
    /// way every URL parser resolves them: `/a/../b` is sent as `/b`.
    pub fn url(&self) -> Result<Url, RequestError> {
        let base_url = self.endpoint.base_url();
        // Rejects empty hosts and hosts carrying path or query delimiters.
        Host::parse(base_url.host())?;

        let mut url = Url::parse(&format!("{}://{}", base_url.scheme(), base_url.host()))?;
        url.set_port(base_url.port())
            .map_err(|()| RequestError::InvalidUrlFormat(format!("{url} cannot carry a port")))?;
        url.set_path(&encode_path(self.endpoint.path()));
        if !self.query_parameters.is_empty() {
            url.set_query(Some(&encode_query(&self.query_items())));
        }
        Ok(url)
    }

    /// The plain-data request handed to a transport.
    pub fn to_wire_request(&self) -> Result<WireRequest, RequestError> {
        Ok(WireRequest {
            url: self.url()?,
            method: self.method,
            headers: header_map(&self.headers),
            body: self.body.clone(),
        })
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, COMPONENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn encode_query(items: &[(String, String)]) -> String {
    items
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, COMPONENT),
                utf8_percent_encode(value, COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.url() {
            Ok(url) => write!(f, "{} {url}", self.method),
            Err(_) => write!(f, "{} <invalid url>", self.method),
        }
    }
}
