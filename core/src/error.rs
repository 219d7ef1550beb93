//! Error types for the Honeycomb API client.
//!
//! # Design
//! Every non-2xx response is turned into a `DetailedError`, the decoded
//! RFC7807 problem-detail body. A body that does not parse never surfaces as
//! a decode failure: a fallback `DetailedError` is synthesized from the HTTP
//! status instead. Local failures (payload serialization, response
//! deserialization, transport, cancellation) get their own `ApiError`
//! variants and are never wrapped as `DetailedError`.
//!
//! Callers narrow on "not found" through the `NotFound` trait rather than by
//! comparing status codes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::ContextError;
use crate::http::HttpResponse;

/// A field-level entry of a problem-detail body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTypeDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub description: String,
}

impl fmt::Display for ErrorTypeDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = [self.code.as_str(), self.field.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        match (head.is_empty(), self.description.is_empty()) {
            (_, true) => f.write_str(&head),
            (true, false) => f.write_str(&self.description),
            (false, false) => write!(f, "{head} - {}", self.description),
        }
    }
}

/// The structured error returned by the API for non-2xx responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedError {
    /// HTTP status code. Always populated once decoded.
    #[serde(default)]
    pub status: u16,
    /// Human readable message, the default rendering.
    #[serde(default, rename = "error")]
    pub message: String,
    /// Machine readable type URI.
    #[serde(default, rename = "type")]
    pub error_type: String,
    #[serde(default)]
    pub title: String,
    /// Optional field-level details, in server order.
    #[serde(default, rename = "type_detail")]
    pub details: Vec<ErrorTypeDetail>,
}

impl DetailedError {
    /// Decode a failed response.
    ///
    /// A body that is not a problem-detail document yields a fallback error
    /// carrying the response status and its status text as the message. A
    /// decoded body that omits `status` takes the status from the response.
    pub fn from_response(response: &HttpResponse) -> Self {
        match serde_json::from_slice::<DetailedError>(&response.body) {
            Ok(mut decoded) => {
                if decoded.status == 0 {
                    decoded.status = response.status;
                }
                decoded
            }
            Err(_) => DetailedError {
                status: response.status,
                message: response.status_text.clone(),
                ..Default::default()
            },
        }
    }
}

impl fmt::Display for DetailedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.details.is_empty() {
            return f.write_str(&self.message);
        }
        for (i, detail) in self.details.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DetailedError {}

/// A failure below HTTP: DNS, connect, TLS, timeout, or a broken body read.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors returned by the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-2xx status.
    #[error(transparent)]
    Detailed(#[from] DetailedError),

    /// No HTTP response was obtained.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The call's context was cancelled or its deadline passed.
    #[error(transparent)]
    Cancelled(#[from] ContextError),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(#[source] serde_json::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(#[source] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A request path had an empty or dot segment, which would address a
    /// different resource once resolved.
    #[error("invalid request path: {0:?}")]
    InvalidPath(String),

    /// A query specification violated a local constraint.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl ApiError {
    /// The API-reported error, if this is one.
    pub fn as_detailed(&self) -> Option<&DetailedError> {
        match self {
            ApiError::Detailed(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP status of an API-reported error.
    pub fn status(&self) -> Option<u16> {
        self.as_detailed().map(|err| err.status)
    }
}

/// Narrowing predicate for "the resource does not exist".
pub trait NotFound {
    fn is_not_found(&self) -> bool;
}

impl NotFound for DetailedError {
    fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl NotFound for ApiError {
    fn is_not_found(&self) -> bool {
        self.as_detailed().is_some_and(|err| err.is_not_found())
    }
}

impl<T: NotFound> NotFound for &T {
    fn is_not_found(&self) -> bool {
        (**self).is_not_found()
    }
}

/// An absent error is never "not found".
impl<T: NotFound> NotFound for Option<T> {
    fn is_not_found(&self) -> bool {
        self.as_ref().is_some_and(|err| err.is_not_found())
    }
}
