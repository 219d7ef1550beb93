//! Query results: running a saved query and collecting its output.
//!
//! # Design
//! Results are computed asynchronously by the API. `get` polls on a fixed
//! interval until the result reports `complete`, sleeping through the call's
//! context so a cancelled or expired context ends the loop between polls.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::context::Context;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::resources::{dataset_segment, segment};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResultRequest {
    pub query_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable_series: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub data: QueryResultData,
    #[serde(default)]
    pub links: QueryResultLinks,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResultData {
    #[serde(default)]
    pub series: Vec<QueryResultRow>,
    #[serde(default)]
    pub results: Vec<QueryResultRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResultRow {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResultLinks {
    #[serde(default, rename = "query_url")]
    pub url: String,
    #[serde(default, rename = "graph_image_url")]
    pub graph_url: String,
}

pub trait QueryResultsApi {
    fn create(&self, ctx: &Context, dataset: &str, request: &QueryResultRequest) -> Result<QueryResult, ApiError>;
    /// Poll until the result is complete.
    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<QueryResult, ApiError>;
}

#[derive(Clone)]
pub struct QueryResults {
    executor: Arc<Executor>,
    poll_interval: Duration,
}

impl QueryResults {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self {
            executor,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl QueryResultsApi for QueryResults {
    fn create(&self, ctx: &Context, dataset: &str, request: &QueryResultRequest) -> Result<QueryResult, ApiError> {
        self.executor
            .post(ctx, &format!("1/query_results/{}", dataset_segment(dataset)), request)
    }

    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<QueryResult, ApiError> {
        let path = format!("1/query_results/{}/{}", dataset_segment(dataset), segment(id));
        let mut polls = 0u32;
        loop {
            let result: QueryResult = self.executor.get(ctx, &path)?;
            polls += 1;
            if result.complete {
                debug!(query_result = %id, polls, "query result complete");
                return Ok(result);
            }
            ctx.sleep(self.poll_interval)?;
        }
    }
}
