//! Base URLs and endpoints.
//!
//! # Design
//! An `Endpoint` keeps its path normalized at all times: the constructor
//! and `set_path` both run [`normalize_path`], so the field can never hold
//! an un-normalized value. Only leading and trailing characters are
//! touched; internal duplicate slashes are the caller's business.

/// Characters stripped from both ends of a path.
const PATH_TRIM: &[char] = &[' ', '/'];

/// Trim spaces and slashes from both ends of `path` and prefix a single `/`.
///
/// Idempotent: normalizing an already-normalized path returns it unchanged.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_matches(PATH_TRIM))
}

/// Host plus transport-security flag of a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseUrl {
    host: String,
    is_secure: bool,
    port: Option<u16>,
}

impl BaseUrl {
    /// A secure (`https`) base URL for `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            is_secure: true,
            port: None,
        }
    }

    /// A plain `http` base URL for `host`.
    pub fn insecure(host: impl Into<String>) -> Self {
        Self::new(host).with_secure(false)
    }

    pub fn with_secure(mut self, is_secure: bool) -> Self {
        self.is_secure = is_secure;
        self
    }

    /// Address a non-default port, e.g. a local test server.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_secure(&self) -> bool {
        self.is_secure
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn scheme(&self) -> &'static str {
        if self.is_secure {
            "https"
        } else {
            "http"
        }
    }
}

/// A base URL paired with a normalized path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    base_url: BaseUrl,
    path: String,
}

impl Endpoint {
    pub fn new(base_url: BaseUrl, path: &str) -> Self {
        Self {
            base_url,
            path: normalize_path(path),
        }
    }

    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Always starts with exactly one `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Replace the path, re-applying normalization.
    pub fn set_path(&mut self, path: &str) {
        self.path = normalize_path(path);
    }

    /// Copy of this endpoint with a different path.
    pub fn with_path(&self, path: &str) -> Self {
        Self::new(self.base_url.clone(), path)
    }
}
