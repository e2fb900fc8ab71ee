//! One-shot executable wrapper around a [`Request`].
//!
//! # Design
//! Configuration steps (`encode`, `set`, `decode`) return new tasks and
//! leave the receiver untouched. `decode` binds a call: the wire request,
//! the transport, and a completion that classifies the outcome and decodes
//! the body. Clones of an armed task share that call, so `start` and
//! `cancel` act on the same execution whichever clone is used.
//!
//! ```text
//! Configured --decode--> Armed --start--> Running --outcome--> Completed
//!                          |                 |
//!                          +----cancel-------+-----> Cancelled
//! ```
//!
//! The completion is moved out of the call exactly once, on `start`, so it
//! can fire at most once. Cancelling an armed task drops it unfired.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{classify, decode_body, EncodeError, RequestError, TransportError};
use crate::http::WireRequest;
use crate::request::Request;
use crate::transport::{CancelToken, Completion, Transport, UreqTransport};

/// Where a task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Configured,
    Armed,
    Running,
    Completed,
    Cancelled,
}

enum Phase {
    Armed {
        request: WireRequest,
        transport: Arc<dyn Transport>,
        completion: Completion,
    },
    Running,
    Completed,
    Cancelled,
}

impl Phase {
    fn state(&self) -> TaskState {
        match self {
            Phase::Armed { .. } => TaskState::Armed,
            Phase::Running => TaskState::Running,
            Phase::Completed => TaskState::Completed,
            Phase::Cancelled => TaskState::Cancelled,
        }
    }
}

/// The execution bound by `decode`.
struct Call {
    cancel: CancelToken,
    phase: Mutex<Phase>,
}

impl Call {
    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self) {
        let mut phase = self.phase();
        if matches!(*phase, Phase::Running) {
            *phase = Phase::Completed;
        }
    }
}

/// A request bound to a transport, ready to be decoded and started.
#[derive(Clone)]
pub struct Task {
    id: Uuid,
    request: Request,
    body: Option<Vec<u8>>,
    transport: Arc<dyn Transport>,
    call: Option<Arc<Call>>,
}

impl Task {
    /// A task for `request` using the default `ureq` transport.
    pub fn new(request: Request) -> Self {
        Self::with_transport(request, Arc::new(UreqTransport::new()))
    }

    pub fn with_transport(request: Request, transport: Arc<dyn Transport>) -> Self {
        let body = request.body().map(<[u8]>::to_vec);
        Self {
            id: Uuid::new_v4(),
            request,
            body,
            transport,
            call: None,
        }
    }

    /// Identifier attached to this task's log events.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn state(&self) -> TaskState {
        match &self.call {
            Some(call) => call.phase().state(),
            None => TaskState::Configured,
        }
    }

    /// Copy with a raw body. The copy is unarmed.
    pub fn with_body(&self, body: Option<Vec<u8>>) -> Task {
        Task {
            request: self.request.clone().with_body(body.clone()),
            body,
            call: None,
            ..self.clone()
        }
    }

    /// Copy whose body is `value` serialized as JSON. The copy is unarmed.
    pub fn encode<E: Serialize + ?Sized>(&self, value: &E) -> Result<Task, EncodeError> {
        let body = serde_json::to_vec(value)?;
        Ok(self.with_body(Some(body)))
    }

    /// Copy that runs on `transport`. An already armed call keeps the
    /// transport it was bound with.
    pub fn set<T: Transport + 'static>(&self, transport: T) -> Task {
        self.set_shared(Arc::new(transport))
    }

    pub fn set_shared(&self, transport: Arc<dyn Transport>) -> Task {
        Task {
            transport,
            ..self.clone()
        }
    }

    /// Arm a copy of this task.
    ///
    /// Builds the wire request now, so an invalid URL is reported here and
    /// not through `completion`. Once started, `completion` receives the
    /// decoded body or the classified error.
    pub fn decode<D, F>(&self, completion: F) -> Result<Task, RequestError>
    where
        D: DeserializeOwned + 'static,
        F: FnOnce(Result<D, RequestError>) + Send + 'static,
    {
        let request = self.request.to_wire_request()?;
        tracing::debug!(
            task_id = %self.id,
            method = %request.method,
            url = %request.url,
            "task armed"
        );

        let task_id = self.id;
        let transport = Arc::clone(&self.transport);
        let call = Arc::new_cyclic(|call: &Weak<Call>| {
            let call = call.clone();
            let on_outcome: Completion = Box::new(move |outcome| {
                let result = classify(outcome).and_then(|response| decode_body::<D>(&response.body));
                match &result {
                    Ok(_) => tracing::trace!(task_id = %task_id, "task completed"),
                    Err(RequestError::DecodingError(context)) => {
                        tracing::warn!(task_id = %task_id, error = %context, "response body did not decode")
                    }
                    Err(err) => tracing::debug!(task_id = %task_id, error = %err, "task failed"),
                }
                if let Some(call) = call.upgrade() {
                    call.finish();
                }
                completion(result);
            });
            Call {
                cancel: CancelToken::new(),
                phase: Mutex::new(Phase::Armed {
                    request,
                    transport,
                    completion: on_outcome,
                }),
            }
        });

        Ok(Task {
            call: Some(call),
            ..self.clone()
        })
    }

    /// Hand the armed call to its transport. Does nothing unless armed.
    pub fn start(&self) -> &Self {
        let Some(call) = &self.call else {
            return self;
        };
        let armed = {
            let mut phase = call.phase();
            match std::mem::replace(&mut *phase, Phase::Running) {
                Phase::Armed {
                    request,
                    transport,
                    completion,
                } => Some((request, transport, completion)),
                other => {
                    *phase = other;
                    None
                }
            }
        };

        if let Some((request, transport, completion)) = armed {
            tracing::debug!(task_id = %self.id, url = %request.url, "task started");
            transport.execute(request, call.cancel.clone(), completion);
        }
        self
    }

    /// Best-effort cancellation.
    ///
    /// An armed task drops its completion unfired. A running task trips its
    /// cancel token; the completion may still fire, with
    /// `NetworkError(Cancelled)` or with the real outcome if it raced ahead.
    pub fn cancel(&self) -> &Self {
        let Some(call) = &self.call else {
            return self;
        };
        let dropped = {
            let mut phase = call.phase();
            match *phase {
                Phase::Armed { .. } | Phase::Running => {
                    call.cancel.cancel();
                    Some(std::mem::replace(&mut *phase, Phase::Cancelled))
                }
                Phase::Completed | Phase::Cancelled => None,
            }
        };
        if dropped.is_some() {
            tracing::debug!(task_id = %self.id, "task cancelled");
        }
        self
    }

    /// Arm, start and wait for the decoded result.
    ///
    /// If the completion is dropped unfired, e.g. the call was cancelled
    /// before it reached the network, this resolves to
    /// `NetworkError(Cancelled)`.
    pub async fn send<D>(self) -> Result<D, RequestError>
    where
        D: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task = self.decode(move |result: Result<D, RequestError>| {
            let _ = tx.send(result);
        })?;
        task.start();
        drop(task);

        rx.await
            .unwrap_or_else(|_| Err(RequestError::NetworkError(TransportError::Cancelled)))
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{BaseUrl, Endpoint};
    use crate::error::DecodeCategory;
    use crate::http::{HttpMethod, WireResponse};
    use crate::query::QueryParameter;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pokemon {
        name: String,
    }

    fn request() -> Request {
        Request::new(
            HttpMethod::Get,
            Endpoint::new(BaseUrl::new("pokeapi.co"), "/api/v2/pokemon"),
        )
    }

    /// Answers every call synchronously with a fixed reply.
    fn replying(status: Option<u16>, body: &'static str) -> impl Transport {
        move |_request: WireRequest, _cancel: CancelToken, completion: Completion| {
            completion(Ok(WireResponse {
                status,
                headers: Vec::new(),
                body: body.as_bytes().to_vec(),
            }));
        }
    }

    /// Holds completions until the test releases them.
    #[derive(Clone, Default)]
    struct Parked {
        calls: Arc<Mutex<Vec<(WireRequest, CancelToken, Completion)>>>,
    }

    impl Transport for Parked {
        fn execute(&self, request: WireRequest, cancel: CancelToken, completion: Completion) {
            self.calls.lock().unwrap().push((request, cancel, completion));
        }
    }

    fn outcome_of<D>(task: &Task) -> Result<D, RequestError>
    where
        D: DeserializeOwned + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let armed = task.decode(move |result: Result<D, RequestError>| tx.send(result).unwrap()).unwrap();
        armed.start();
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn new_task_is_configured() {
        let task = Task::new(request());
        assert_eq!(task.state(), TaskState::Configured);
        assert!(task.body().is_none());
    }

    #[test]
    fn encode_sets_body_on_task_and_request() {
        let task = Task::new(request())
            .encode(&serde_json::json!({"name": "pikachu"}))
            .unwrap();

        assert_eq!(task.body(), Some(&br#"{"name":"pikachu"}"#[..]));
        assert_eq!(task.request().body(), task.body());
        assert_eq!(task.state(), TaskState::Configured);
    }

    #[test]
    fn encode_reports_serialization_failure() {
        use std::collections::HashMap;

        // JSON object keys must be strings.
        let mut value = HashMap::new();
        value.insert(vec![1u8], 1);
        assert!(Task::new(request()).encode(&value).is_err());
    }

    #[test]
    fn decode_arms_a_copy() {
        let task = Task::new(request()).set(replying(Some(200), "{}"));
        let armed = task.decode(|_: Result<serde_json::Value, RequestError>| {}).unwrap();

        assert_eq!(task.state(), TaskState::Configured);
        assert_eq!(armed.state(), TaskState::Armed);
    }

    #[test]
    fn decode_fails_fast_on_invalid_url() {
        let bad = Request::new(HttpMethod::Get, Endpoint::new(BaseUrl::new(""), "/"));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);

        let err = Task::new(bad)
            .decode(move |_: Result<serde_json::Value, RequestError>| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap_err();

        assert!(matches!(err, RequestError::InvalidUrlFormat(_)));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn success_decodes_body() {
        let task = Task::new(request()).set(replying(Some(200), r#"{"name":"bulbasaur"}"#));
        let pokemon: Pokemon = outcome_of(&task).unwrap();
        assert_eq!(pokemon.name, "bulbasaur");
    }

    #[test]
    fn status_errors_skip_decoding() {
        let task = Task::new(request()).set(replying(Some(404), "not json at all"));
        assert!(matches!(outcome_of::<Pokemon>(&task), Err(RequestError::RequestError(404))));

        let task = Task::new(request()).set(replying(Some(500), ""));
        assert!(matches!(outcome_of::<Pokemon>(&task), Err(RequestError::ServerError(500))));

        let task = Task::new(request()).set(replying(Some(302), ""));
        assert!(matches!(outcome_of::<Pokemon>(&task), Err(RequestError::UnhandledResponse)));
    }

    #[test]
    fn reply_without_status_is_unknown() {
        let task = Task::new(request()).set(replying(None, r#"{"name":"x"}"#));
        assert!(matches!(outcome_of::<Pokemon>(&task), Err(RequestError::UnknownResponse)));
    }

    #[test]
    fn transport_failure_is_network_error() {
        let failing = |_: WireRequest, _: CancelToken, completion: Completion| {
            completion(Err(TransportError::Io(std::io::Error::other("refused"))));
        };
        let task = Task::new(request()).set(failing);
        assert!(matches!(outcome_of::<Pokemon>(&task), Err(RequestError::NetworkError(_))));
    }

    #[test]
    fn malformed_body_is_decoding_error() {
        let task = Task::new(request()).set(replying(Some(200), r#"{"id": 3}"#));
        match outcome_of::<Pokemon>(&task) {
            Err(RequestError::DecodingError(context)) => {
                assert_eq!(context.category, DecodeCategory::Data);
                assert!(!context.description.is_empty());
            }
            other => panic!("expected DecodingError, got {other:?}"),
        }
    }

    #[test]
    fn wire_request_reflects_encoded_body_and_query() {
        let parked = Parked::default();
        let task = Task::new(request().appending([QueryParameter::new("limit", 5)]))
            .encode(&serde_json::json!({"a": 1}))
            .unwrap()
            .set(parked.clone());

        task.decode(|_: Result<serde_json::Value, RequestError>| {}).unwrap().start();

        let calls = parked.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.url.as_str(), "https://pokeapi.co/api/v2/pokemon?limit=5");
        assert_eq!(calls[0].0.body.as_deref(), Some(&br#"{"a":1}"#[..]));
    }

    #[test]
    fn start_without_decode_is_a_no_op() {
        let parked = Parked::default();
        let task = Task::new(request()).set(parked.clone());
        task.start();

        assert!(parked.calls.lock().unwrap().is_empty());
        assert_eq!(task.state(), TaskState::Configured);
    }

    #[test]
    fn completion_fires_once_even_if_started_twice() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let task = Task::new(request())
            .set(replying(Some(200), "{}"))
            .decode(move |_: Result<serde_json::Value, RequestError>| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        task.start();
        task.clone().start();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(task.state(), TaskState::Completed);
    }

    #[test]
    fn cancel_before_start_never_fires() {
        let parked = Parked::default();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let task = Task::new(request())
            .set(parked.clone())
            .decode(move |_: Result<serde_json::Value, RequestError>| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        task.cancel();
        task.start();

        assert_eq!(task.state(), TaskState::Cancelled);
        assert!(parked.calls.lock().unwrap().is_empty());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_while_running_trips_token() {
        let parked = Parked::default();
        let task = Task::new(request())
            .set(parked.clone())
            .decode(|_: Result<serde_json::Value, RequestError>| {})
            .unwrap();

        task.start();
        assert_eq!(task.state(), TaskState::Running);

        task.cancel();
        assert_eq!(task.state(), TaskState::Cancelled);
        assert!(parked.calls.lock().unwrap()[0].1.is_cancelled());
    }

    #[test]
    fn late_outcome_after_cancel_keeps_cancelled_state() {
        let parked = Parked::default();
        let (tx, rx) = mpsc::channel();
        let task = Task::new(request())
            .set(parked.clone())
            .decode(move |result: Result<serde_json::Value, RequestError>| tx.send(result).unwrap())
            .unwrap();

        task.start();
        task.cancel();
        let (_, _, completion) = parked.calls.lock().unwrap().pop().unwrap();
        completion(Err(TransportError::Cancelled));

        assert!(matches!(
            rx.recv().unwrap(),
            Err(RequestError::NetworkError(TransportError::Cancelled))
        ));
        assert_eq!(task.state(), TaskState::Cancelled);
    }

    #[tokio::test]
    async fn send_resolves_with_decoded_value() {
        let task = Task::new(request()).set(replying(Some(201), r#"{"name":"mew"}"#));
        let pokemon: Pokemon = task.send().await.unwrap();
        assert_eq!(pokemon, Pokemon { name: "mew".into() });
    }

    #[tokio::test]
    async fn send_resolves_cancelled_when_completion_is_dropped() {
        let dropping = |_: WireRequest, _: CancelToken, completion: Completion| drop(completion);
        let task = Task::new(request()).set(dropping);
        assert!(matches!(
            task.send::<Pokemon>().await,
            Err(RequestError::NetworkError(TransportError::Cancelled))
        ));
    }
}
