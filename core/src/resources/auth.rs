//! API key introspection.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ApiError;
use crate::executor::Executor;

/// What the current API key may do, and where it belongs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "type")]
    pub key_type: String,
    #[serde(default)]
    pub api_key_access: ApiKeyAccess,
    #[serde(default)]
    pub environment: Slugged,
    #[serde(default)]
    pub team: Slugged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeyAccess {
    pub events: bool,
    pub markers: bool,
    pub triggers: bool,
    pub boards: bool,
    pub queries: bool,
    pub columns: bool,
    pub create_datasets: bool,
    pub slos: bool,
    pub recipients: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slugged {
    pub name: String,
    pub slug: String,
}

pub trait AuthApi {
    fn get(&self, ctx: &Context) -> Result<AuthMetadata, ApiError>;
}

#[derive(Clone)]
pub struct Auth {
    executor: Arc<Executor>,
}

impl Auth {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

impl AuthApi for Auth {
    fn get(&self, ctx: &Context) -> Result<AuthMetadata, ApiError> {
        self.executor.get(ctx, "1/auth")
    }
}
