//! Header fields.
//!
//! Known header kinds are closed enums implementing [`HeaderField`];
//! anything else goes through [`CustomHeader`] or a caller-provided
//! implementation of the trait.

use std::sync::Arc;

use crate::http::HeaderMap;

/// Something that produces one wire header.
pub trait HeaderField: Send + Sync + std::fmt::Debug {
    fn key(&self) -> &str;
    fn value(&self) -> String;
}

/// A header field shared between clones of a request.
pub type SharedHeader = Arc<dyn HeaderField>;

/// Credentials sent under the `Authentication` key. Tokens are opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    Bearer(String),
    Basic(String),
}

impl HeaderField for Authentication {
    fn key(&self) -> &str {
        "Authentication"
    }

    fn value(&self) -> String {
        match self {
            Authentication::Bearer(token) => format!("Bearer {token}"),
            Authentication::Basic(token) => format!("Basic {token}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
}

impl HeaderField for ContentType {
    fn key(&self) -> &str {
        "Content-Type"
    }

    fn value(&self) -> String {
        match self {
            ContentType::Json => "application/json".to_string(),
        }
    }
}

/// Arbitrary key/value header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomHeader {
    key: String,
    value: String,
}

impl CustomHeader {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl HeaderField for CustomHeader {
    fn key(&self) -> &str {
        &self.key
    }

    fn value(&self) -> String {
        self.value.clone()
    }
}

/// Fold headers into a key/value map. For duplicate keys the last one wins.
pub fn header_map<'a, I>(headers: I) -> HeaderMap
where
    I: IntoIterator<Item = &'a SharedHeader>,
{
    let mut map = HeaderMap::new();
    for header in headers {
        map.insert(header.key().to_string(), header.value());
    }
    map
}
