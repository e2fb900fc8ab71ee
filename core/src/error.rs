//! Error taxonomy and response classification.
//!
//! # Design
//! Classification always runs before decoding: a transport failure wins
//! over everything, a reply without a status is `UnknownResponse`, and only
//! a 2xx status lets the body reach the decoder. Decode failures are never
//! surfaced raw; they are wrapped into `DecodingError` with a readable
//! context.

use std::fmt;

use serde::de::DeserializeOwned;

use crate::http::WireResponse;

/// Failures reported by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The call was cancelled before it could complete.
    #[error("request cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure raised by the underlying client.
    #[error("transport failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Rough shape of a decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeCategory {
    /// The payload is not valid JSON.
    Syntax,
    /// Valid JSON that does not match the target type: missing field,
    /// type mismatch, unknown variant.
    Data,
    /// The payload ended early.
    Eof,
    Io,
}

/// Where and why decoding a response body failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodingContext {
    pub category: DecodeCategory,
    pub description: String,
    pub line: usize,
    pub column: usize,
}

impl From<&serde_json::Error> for DecodingContext {
    fn from(err: &serde_json::Error) -> Self {
        use serde_json::error::Category;

        let category = match err.classify() {
            Category::Syntax => DecodeCategory::Syntax,
            Category::Data => DecodeCategory::Data,
            Category::Eof => DecodeCategory::Eof,
            Category::Io => DecodeCategory::Io,
        };
        Self {
            category,
            description: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

impl fmt::Display for DecodingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Errors delivered for a request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The reply was not an HTTP response.
    #[error("unknown response")]
    UnknownResponse,

    /// Timeout, connectivity issue, or cancellation.
    #[error("network error: {0}")]
    NetworkError(#[source] TransportError),

    /// HTTP 4xx.
    #[error("request error: {0}")]
    RequestError(u16),

    /// HTTP 5xx.
    #[error("server error: {0}")]
    ServerError(u16),

    /// The body could not be decoded into the expected type.
    #[error("decoding error: {0}")]
    DecodingError(DecodingContext),

    /// Any status outside 2xx, 4xx and 5xx.
    #[error("unhandled response")]
    UnhandledResponse,

    #[error("invalid URL format: {0}")]
    InvalidUrlFormat(String),
}

impl From<url::ParseError> for RequestError {
    fn from(err: url::ParseError) -> Self {
        RequestError::InvalidUrlFormat(err.to_string())
    }
}

/// Serializing a request body failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to encode request body: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// Map a status code to an error, `Ok` for 2xx.
///
/// `None` means the reply carried no HTTP status.
pub fn classify_status(status: Option<u16>) -> Result<(), RequestError> {
    let Some(code) = status else {
        return Err(RequestError::UnknownResponse);
    };
    match code {
        200..=299 => Ok(()),
        400..=499 => Err(RequestError::RequestError(code)),
        500..=599 => Err(RequestError::ServerError(code)),
        _ => Err(RequestError::UnhandledResponse),
    }
}

/// Classify a finished call. Returns the response only on the success path.
pub fn classify(outcome: Result<WireResponse, TransportError>) -> Result<WireResponse, RequestError> {
    let response = outcome.map_err(RequestError::NetworkError)?;
    classify_status(response.status)?;
    Ok(response)
}

/// Decode a JSON body into `D`, wrapping failures into `DecodingError`.
pub fn decode_body<D: DeserializeOwned>(body: &[u8]) -> Result<D, RequestError> {
    serde_json::from_slice(body).map_err(|e| RequestError::DecodingError(DecodingContext::from(&e)))
}
