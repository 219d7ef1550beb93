//! Derived columns: server-stored expressions referencable like columns.
//!
//! Derived columns created against [`ALL_DATASETS`](crate::resources::ALL_DATASETS)
//! are environment-wide.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::resources::{dataset_segment, segment, with_param};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedColumn {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub alias: String,
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub trait DerivedColumnsApi {
    fn list(&self, ctx: &Context, dataset: &str) -> Result<Vec<DerivedColumn>, ApiError>;
    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<DerivedColumn, ApiError>;
    fn get_by_alias(&self, ctx: &Context, dataset: &str, alias: &str) -> Result<DerivedColumn, ApiError>;
    fn create(&self, ctx: &Context, dataset: &str, column: &DerivedColumn) -> Result<DerivedColumn, ApiError>;
    fn update(
        &self,
        ctx: &Context,
        dataset: &str,
        id: &str,
        column: &DerivedColumn,
    ) -> Result<DerivedColumn, ApiError>;
    fn delete(&self, ctx: &Context, dataset: &str, id: &str) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct DerivedColumns {
    executor: Arc<Executor>,
}

impl DerivedColumns {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

fn collection(dataset: &str) -> String {
    format!("1/derived_columns/{}", dataset_segment(dataset))
}

fn member(dataset: &str, id: &str) -> String {
    format!("{}/{}", collection(dataset), segment(id))
}

impl DerivedColumnsApi for DerivedColumns {
    fn list(&self, ctx: &Context, dataset: &str) -> Result<Vec<DerivedColumn>, ApiError> {
        self.executor.get(ctx, &collection(dataset))
    }

    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<DerivedColumn, ApiError> {
        self.executor.get(ctx, &member(dataset, id))
    }

    fn get_by_alias(&self, ctx: &Context, dataset: &str, alias: &str) -> Result<DerivedColumn, ApiError> {
        self.executor
            .get(ctx, &with_param(&collection(dataset), "alias", alias))
    }

    fn create(&self, ctx: &Context, dataset: &str, column: &DerivedColumn) -> Result<DerivedColumn, ApiError> {
        self.executor.post(ctx, &collection(dataset), column)
    }

    fn update(
        &self,
        ctx: &Context,
        dataset: &str,
        id: &str,
        column: &DerivedColumn,
    ) -> Result<DerivedColumn, ApiError> {
        self.executor.put(ctx, &member(dataset, id), column)
    }

    fn delete(&self, ctx: &Context, dataset: &str, id: &str) -> Result<(), ApiError> {
        self.executor.delete(ctx, &member(dataset, id))
    }
}
