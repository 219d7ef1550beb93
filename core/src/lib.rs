//! Blocking client for the Honeycomb API.
//!
//! # Overview
//! Every call flows through one [`Executor`]: it builds the request, sends it
//! under the [`RetryPolicy`], decodes non-2xx responses into a
//! [`DetailedError`] and deserializes successful bodies. The resource
//! wrappers under [`resources`] only know their paths and payload types.
//!
//! # Design
//! - The network sits behind the [`Transport`] trait. [`UreqTransport`] is
//!   the default; [`testing::ScriptedTransport`] replays canned outcomes.
//! - Calls take a [`Context`] that carries cancellation and a deadline. Both
//!   are honored before each attempt and during retry backoff.
//! - Errors are classified through [`NotFound`] rather than by matching on
//!   status codes at every call site.
//! - [`QuerySpec::equivalent_to`] compares a query with the normalized copy
//!   the server returns.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod http;
pub mod query;
pub mod resources;
pub mod retry;
pub mod testing;
pub mod transport;

pub use client::Client;
pub use config::Config;
pub use context::{Context, ContextError};
pub use error::{ApiError, DetailedError, ErrorTypeDetail, NotFound, TransportError};
pub use executor::Executor;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::QuerySpec;
pub use retry::RetryPolicy;
pub use transport::{Transport, UreqTransport};
