//! Pluggable transports.
//!
//! # Design
//! A transport receives a finished `WireRequest` and runs the exchange on
//! its own scheduling. It reports back through a one-shot completion, so
//! the core never blocks the caller. The transport decides nothing about
//! status codes: 4xx and 5xx replies come back as data and the core
//! classifies them.
//!
//! Cancellation is cooperative. A transport checks the [`CancelToken`]
//! before doing network work (and may drop the completion without calling
//! it), and reports [`TransportError::Cancelled`] if the token tripped
//! while the call was in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::Deserialize;

use crate::error::TransportError;
use crate::http::{HeaderMap, HttpMethod, WireRequest, WireResponse};

/// Receives the outcome of one call.
pub type Completion = Box<dyn FnOnce(Result<WireResponse, TransportError>) + Send + 'static>;

/// Executes wire requests.
///
/// Implementations must call `completion` at most once, and exactly once
/// unless they observe `cancel` before any network activity.
pub trait Transport: Send + Sync {
    fn execute(&self, request: WireRequest, cancel: CancelToken, completion: Completion);
}

impl<F> Transport for F
where
    F: Fn(WireRequest, CancelToken, Completion) + Send + Sync,
{
    fn execute(&self, request: WireRequest, cancel: CancelToken, completion: Completion) {
        self(request, cancel, completion)
    }
}

/// Shared cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Settings for [`UreqTransport`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Upper bound on a whole call in milliseconds, `None` for no limit.
    pub timeout_ms: Option<u64>,
    pub max_redirects: u32,
    /// Largest response body accepted, `None` for no limit.
    pub max_body_bytes: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            max_redirects: 10,
            max_body_bytes: None,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Blocking `ureq` agent driven from a worker thread per call.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::with_config(&TransportConfig::default())
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout())
            .max_redirects(config.max_redirects)
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: config.max_body_bytes.unwrap_or(u64::MAX),
        }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: WireRequest, cancel: CancelToken, completion: Completion) {
        let agent = self.agent.clone();
        let body_limit = self.body_limit;
        // Shared with the spawn error path so the completion still fires
        // if no worker can be started.
        let slot = Arc::new(Mutex::new(Some(completion)));
        let worker_slot = Arc::clone(&slot);

        let spawned = thread::Builder::new()
            .name("courier-ureq".to_string())
            .spawn(move || {
                let Some(completion) = take(&worker_slot) else {
                    return;
                };
                if cancel.is_cancelled() {
                    tracing::debug!(url = %request.url, "call cancelled before sending");
                    return;
                }
                let outcome = send(&agent, request, body_limit);
                if cancel.is_cancelled() {
                    completion(Err(TransportError::Cancelled));
                } else {
                    completion(outcome);
                }
            });

        if let Err(err) = spawned {
            tracing::error!(error = %err, "failed to spawn transport worker");
            if let Some(completion) = take(&slot) {
                completion(Err(TransportError::Io(err)));
            }
        }
    }
}

fn take(slot: &Mutex<Option<Completion>>) -> Option<Completion> {
    slot.lock().ok().and_then(|mut guard| guard.take())
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &HeaderMap) -> ureq::RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}

fn send(agent: &ureq::Agent, request: WireRequest, body_limit: u64) -> Result<WireResponse, TransportError> {
    let url = request.url.as_str();
    let headers = &request.headers;

    let result = match (request.method, request.body.as_deref()) {
        (HttpMethod::Get, _) => with_headers(agent.get(url), headers).call(),
        (HttpMethod::Delete, None) => with_headers(agent.delete(url), headers).call(),
        (HttpMethod::Delete, Some(body)) => {
            with_headers(agent.delete(url).force_send_body(), headers).send(body)
        }
        (HttpMethod::Post, Some(body)) => with_headers(agent.post(url), headers).send(body),
        (HttpMethod::Post, None) => with_headers(agent.post(url), headers).send_empty(),
        (HttpMethod::Patch, Some(body)) => with_headers(agent.patch(url), headers).send(body),
        (HttpMethod::Patch, None) => with_headers(agent.patch(url), headers).send_empty(),
    };

    let mut response = result.map_err(|e| TransportError::Failed(Box::new(e)))?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .with_config()
        .limit(body_limit)
        .read_to_vec()
        .map_err(|e| TransportError::Failed(Box::new(e)))?;

    Ok(WireResponse {
        status: Some(status),
        headers,
        body,
    })
}
