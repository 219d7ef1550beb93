//! Datasets.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::resources::dataset_segment;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_json_depth: Option<u32>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub last_written_at: Option<String>,
}

/// Mutable settings of an existing dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_json_depth: Option<u32>,
}

pub trait DatasetsApi {
    fn list(&self, ctx: &Context) -> Result<Vec<Dataset>, ApiError>;
    fn get(&self, ctx: &Context, slug: &str) -> Result<Dataset, ApiError>;
    /// Creating a dataset that already exists returns the existing one.
    fn create(&self, ctx: &Context, dataset: &Dataset) -> Result<Dataset, ApiError>;
    fn update(&self, ctx: &Context, slug: &str, update: &DatasetUpdate) -> Result<Dataset, ApiError>;
    fn delete(&self, ctx: &Context, slug: &str) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct Datasets {
    executor: Arc<Executor>,
}

impl Datasets {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

impl DatasetsApi for Datasets {
    fn list(&self, ctx: &Context) -> Result<Vec<Dataset>, ApiError> {
        self.executor.get(ctx, "1/datasets")
    }

    fn get(&self, ctx: &Context, slug: &str) -> Result<Dataset, ApiError> {
        self.executor
            .get(ctx, &format!("1/datasets/{}", dataset_segment(slug)))
    }

    fn create(&self, ctx: &Context, dataset: &Dataset) -> Result<Dataset, ApiError> {
        self.executor.post(ctx, "1/datasets", dataset)
    }

    fn update(&self, ctx: &Context, slug: &str, update: &DatasetUpdate) -> Result<Dataset, ApiError> {
        self.executor
            .put(ctx, &format!("1/datasets/{}", dataset_segment(slug)), update)
    }

    fn delete(&self, ctx: &Context, slug: &str) -> Result<(), ApiError> {
        self.executor
            .delete(ctx, &format!("1/datasets/{}", dataset_segment(slug)))
    }
}
