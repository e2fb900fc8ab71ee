//! Typed HTTP request construction and execution.
//!
//! # Overview
//! Callers describe a target as immutable values (`BaseUrl`, `Endpoint`,
//! `QueryParameter`, `HeaderField`, `Request`). A `Task` turns a request
//! into a `WireRequest`, runs it on a pluggable `Transport`, classifies
//! the reply into a `RequestError` or decodes the body, and reports
//! through a single completion.
//!
//! ```text
//! BaseUrl + Endpoint -> Request -> Task::decode -> Transport
//!                                                   |
//!        completion <- decode <- classify <---------+
//! ```
//!
//! # Design
//! - Value types are copy-on-write; "mutating" calls return new values.
//! - URL errors are synchronous. Once a task is armed, every failure goes
//!   through the completion and nothing else.
//! - The default transport is a blocking `ureq` agent on a worker thread;
//!   any `Fn(WireRequest, CancelToken, Completion)` works as a transport.
//! - No retries, pooling, caching or credential handling live here.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod header;
pub mod http;
pub mod query;
pub mod request;
pub mod task;
pub mod transport;

pub use client::Client;
pub use endpoint::{normalize_path, BaseUrl, Endpoint};
pub use error::{
    classify, classify_status, DecodeCategory, DecodingContext, EncodeError, RequestError, TransportError,
};
pub use header::{header_map, Authentication, ContentType, CustomHeader, HeaderField, SharedHeader};
pub use http::{HeaderMap, HttpMethod, WireRequest, WireResponse};
pub use query::{QueryParameter, QueryParameters, QueryValue};
pub use request::Request;
pub use task::{Task, TaskState};
pub use transport::{CancelToken, Completion, Transport, TransportConfig, UreqTransport};
pub use url::Url;
