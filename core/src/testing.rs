//! Testing utilities for code built on the client.
//!
//! `ScriptedTransport` replays a fixed sequence of outcomes and records every
//! request it receives, so callers can exercise retry, error decoding and
//! resource wrappers without a server.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use honeycombio::testing::{json_response, ScriptedTransport};
//!
//! let transport = Arc::new(ScriptedTransport::new().then(Ok(json_response(200, "[]"))));
//! let client = Client::with_transport(Config::new("key"), transport.clone())?;
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use crate::error::TransportError;
use crate::http::{status_text, HttpRequest, HttpResponse};
use crate::transport::Transport;

type Outcome = Result<HttpResponse, TransportError>;
type AttemptHook = Box<dyn Fn(usize) + Send + Sync>;

/// A transport that answers from a script.
///
/// Queued outcomes are consumed in order. Once the queue is empty the
/// `always` outcome is repeated; without one the transport reports a
/// transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Option<Outcome>,
    requests: Mutex<Vec<HttpRequest>>,
    deadlines: Mutex<Vec<Option<Instant>>>,
    hook: Option<AttemptHook>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one outcome.
    pub fn then(self, outcome: Outcome) -> Self {
        lock(&self.script).push_back(outcome);
        self
    }

    /// Outcome returned once the queue is drained.
    pub fn always(mut self, outcome: Outcome) -> Self {
        self.fallback = Some(outcome);
        self
    }

    /// Run `hook` with the 1-based attempt number before answering.
    pub fn on_attempt<F>(mut self, hook: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn attempts(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Deadline handed over with each attempt, in order.
    pub fn deadlines(&self) -> Vec<Option<Instant>> {
        lock(&self.deadlines).clone()
    }
}

impl Transport for ScriptedTransport {
    fn execute(
        &self,
        request: &HttpRequest,
        deadline: Option<Instant>,
    ) -> Result<HttpResponse, TransportError> {
        lock(&self.deadlines).push(deadline);
        let attempt = {
            let mut requests = lock(&self.requests);
            requests.push(request.clone());
            requests.len()
        };
        if let Some(hook) = &self.hook {
            hook(attempt);
        }
        let queued = lock(&self.script).pop_front();
        match queued.or_else(|| self.fallback.clone()) {
            Some(outcome) => outcome,
            None => Err(TransportError::new("scripted transport exhausted")),
        }
    }
}

/// A response with a JSON content type, the given status and body.
pub fn json_response(status: u16, body: &str) -> HttpResponse {
    let reason = ureq::http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason());
    HttpResponse {
        status,
        status_text: status_text(status, reason),
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: body.as_bytes().to_vec(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
