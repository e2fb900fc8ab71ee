//! Shared entry point that hands out tasks bound to one transport.
//!
//! # Design
//! `Client` plays the role of a session: it owns an `Arc<dyn Transport>`
//! and every task it creates shares that transport. The client itself
//! holds no per-call state, so it can be cloned freely across threads.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::RequestError;
use crate::request::Request;
use crate::task::Task;
use crate::transport::{Transport, TransportConfig, UreqTransport};

#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(UreqTransport::new())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// A client on a `ureq` transport built from `config`.
    pub fn with_config(config: &TransportConfig) -> Self {
        Self::new(UreqTransport::with_config(config))
    }

    pub fn task(&self, request: Request) -> Task {
        Task::with_transport(request, Arc::clone(&self.transport))
    }

    /// Arm and start a task in one step.
    ///
    /// URL errors come back synchronously; everything after that goes to
    /// `completion`. The returned task is running and can be cancelled.
    pub fn codable_task<D, F>(
        &self,
        request: Request,
        body: Option<Vec<u8>>,
        completion: F,
    ) -> Result<Task, RequestError>
    where
        D: DeserializeOwned + 'static,
        F: FnOnce(Result<D, RequestError>) + Send + 'static,
    {
        let mut task = self.task(request);
        if body.is_some() {
            task = task.with_body(body);
        }
        let task = task.decode(completion)?;
        task.start();
        Ok(task)
    }

    /// Run `request` and await the decoded response.
    pub async fn send<D>(&self, request: Request) -> Result<D, RequestError>
    where
        D: DeserializeOwned + Send + 'static,
    {
        self.task(request).send().await
    }
}
