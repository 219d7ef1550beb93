//! The request executor: the single chokepoint for every API call.
//!
//! # Design
//! A call is split the same way on every path:
//! 1. `build_request` serializes the payload and resolves the path against
//!    the base URL. Nothing touches the network if this fails.
//! 2. `send` runs the request through the retry policy and returns the last
//!    response obtained, whatever its status.
//! 3. `check_status` turns a non-2xx response into a `DetailedError`.
//! 4. The 2xx body is deserialized into the caller's type, or ignored for
//!    calls with empty responses.
//!
//! The executor holds only read-only configuration and a shared transport,
//! so one instance is shared by reference across threads without locking.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::context::Context;
use crate::error::{ApiError, DetailedError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::retry::RetryPolicy;
use crate::transport::Transport;

pub const API_KEY_HEADER: &str = "X-Honeycomb-Team";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Executes API requests with retry and error decoding.
pub struct Executor {
    base_url: Url,
    headers: Vec<(String, String)>,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    debug: bool,
}

impl Executor {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Result<Self, ApiError> {
        let base_url = config.validate()?;
        Ok(Self {
            base_url,
            headers: vec![
                ("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()),
                ("User-Agent".to_string(), config.user_agent.clone()),
                (API_KEY_HEADER.to_string(), config.api_key.clone()),
            ],
            transport,
            retry: config.retry,
            debug: config.debug,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the request for `path`, relative to the base URL.
    ///
    /// `path` must already have its dynamic segments escaped. Paths with an
    /// empty, `.` or `..` segment are rejected.
    pub fn build_request<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpRequest, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(ApiError::SerializationError)?;
        let path = path.trim_start_matches('/');
        if has_ambiguous_segment(path) {
            return Err(ApiError::InvalidPath(path.to_string()));
        }
        let url = self.base_url.join(path)?;
        Ok(HttpRequest {
            method,
            url: url.into(),
            headers: self.headers.clone(),
            body,
        })
    }

    /// Run `request` through the retry policy.
    ///
    /// Returns the final response of any status. Returns the transport error
    /// if the last attempt obtained no response, and the context error as
    /// soon as the context is done.
    pub fn send(&self, ctx: &Context, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut attempt = 0u32;
        loop {
            if let Some(err) = ctx.err() {
                return Err(err.into());
            }
            attempt += 1;
            debug!(method = %request.method, url = %request.url, attempt, "sending request");
            if self.debug {
                if let Some(body) = &request.body {
                    debug!(body = %String::from_utf8_lossy(body), "request body");
                }
            }

            let outcome = self.transport.execute(request, ctx.deadline());
            let retry = self.retry.check(ctx, &outcome)?;
            if !retry || attempt >= self.retry.max_attempts {
                if retry {
                    warn!(method = %request.method, url = %request.url, attempt, "giving up after retries");
                }
                return outcome.map_err(ApiError::from);
            }

            let wait = self.retry.backoff(attempt - 1, outcome.as_ref().ok());
            match &outcome {
                Ok(response) => warn!(
                    status = response.status,
                    attempt,
                    delay_ms = wait.as_millis() as u64,
                    "retrying request"
                ),
                Err(err) => warn!(
                    error = %err,
                    attempt,
                    delay_ms = wait.as_millis() as u64,
                    "retrying request after transport error"
                ),
            }
            ctx.sleep(wait)?;
        }
    }

    /// Execute a call and deserialize its JSON response into `R`.
    pub fn perform<B, R>(
        &self,
        ctx: &Context,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.exchange(ctx, method, path, body)?;
        serde_json::from_slice(&response.body).map_err(ApiError::DeserializationError)
    }

    /// Execute a call whose response body is not needed.
    pub fn perform_empty<B>(
        &self,
        ctx: &Context,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.exchange(ctx, method, path, body).map(|_| ())
    }

    pub fn get<R: DeserializeOwned>(&self, ctx: &Context, path: &str) -> Result<R, ApiError> {
        self.perform(ctx, HttpMethod::Get, path, None::<&()>)
    }

    pub fn post<B, R>(&self, ctx: &Context, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.perform(ctx, HttpMethod::Post, path, Some(body))
    }

    pub fn put<B, R>(&self, ctx: &Context, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.perform(ctx, HttpMethod::Put, path, Some(body))
    }

    pub fn delete(&self, ctx: &Context, path: &str) -> Result<(), ApiError> {
        self.perform_empty(ctx, HttpMethod::Delete, path, None::<&()>)
    }

    fn exchange<B>(
        &self,
        ctx: &Context,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpResponse, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.build_request(method, path, body)?;
        let response = self.send(ctx, &request)?;
        if self.debug {
            debug!(
                status = response.status,
                body = %String::from_utf8_lossy(&response.body),
                "response"
            );
        }
        check_status(response)
    }
}

/// Map a non-2xx response to a `DetailedError`.
/// Whether URL resolution would drop or collapse a segment of `path`.
fn has_ambiguous_segment(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded.is_empty() || decoded == "." || decoded == ".."
    })
}

fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    Err(DetailedError::from_response(&response).into())
}
