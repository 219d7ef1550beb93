//! The seam between the executor and the network.
//!
//! # Design
//! `Transport` performs exactly one HTTP exchange and reports every status,
//! 4xx and 5xx included, as an `HttpResponse`. Only failures where no
//! response was obtained come back as `TransportError`. Retry and error
//! decoding stay in the executor, so any transport (the pooled `ureq` agent
//! used by default, or a scripted one in tests) gets identical semantics.
//!
//! Each exchange also receives the caller's deadline, if any. A transport
//! must not let a single attempt run past it.

use std::time::{Duration, Instant};

use crate::error::TransportError;
use crate::http::{status_text, HttpMethod, HttpRequest, HttpResponse};

/// Executes a single HTTP exchange.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: &HttpRequest,
        deadline: Option<Instant>,
    ) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport over one pooled `ureq::Agent`.
///
/// The agent, and with it the connection pool, is created once and shared
/// by every call made through the client.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    timeout: Duration,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent, timeout }
    }
}

impl Transport for UreqTransport {
    fn execute(
        &self,
        request: &HttpRequest,
        deadline: Option<Instant>,
    ) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let headers = request.headers.as_slice();
        let timeout = attempt_timeout(self.timeout, deadline, Instant::now());

        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => prepare(self.agent.get(url), headers, timeout).call(),
            (HttpMethod::Delete, _) => prepare(self.agent.delete(url), headers, timeout).call(),
            (HttpMethod::Post, Some(body)) => prepare(self.agent.post(url), headers, timeout).send(body),
            (HttpMethod::Post, None) => prepare(self.agent.post(url), headers, timeout).send_empty(),
            (HttpMethod::Put, Some(body)) => prepare(self.agent.put(url), headers, timeout).send(body),
            (HttpMethod::Put, None) => prepare(self.agent.put(url), headers, timeout).send_empty(),
        };
        let mut response = result.map_err(|e| TransportError::new(e.to_string()))?;

        let status = response.status();
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
            .read_to_vec()
            .map_err(|e| TransportError::new(format!("reading response body: {e}")))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status_text(status.as_u16(), status.canonical_reason()),
            headers,
            body,
        })
    }
}

/// Time one attempt may take: the configured timeout, cut short by the
/// deadline when that comes first.
fn attempt_timeout(limit: Duration, deadline: Option<Instant>, now: Instant) -> Duration {
    match deadline {
        Some(deadline) => limit.min(deadline.saturating_duration_since(now)),
        None => limit,
    }
}

fn prepare<B>(
    builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
    timeout: Duration,
) -> ureq::RequestBuilder<B> {
    let mut builder = builder.config().timeout_global(Some(timeout)).build();
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
