//! Dataset columns.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::resources::{dataset_segment, segment, with_param};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    String,
    Float,
    Integer,
    Boolean,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub key_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub column_type: Option<ColumnType>,
    #[serde(default, skip_serializing)]
    pub last_written: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<String>,
}

pub trait ColumnsApi {
    fn list(&self, ctx: &Context, dataset: &str) -> Result<Vec<Column>, ApiError>;
    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<Column, ApiError>;
    fn get_by_key_name(&self, ctx: &Context, dataset: &str, key_name: &str) -> Result<Column, ApiError>;
    fn create(&self, ctx: &Context, dataset: &str, column: &Column) -> Result<Column, ApiError>;
    fn update(&self, ctx: &Context, dataset: &str, id: &str, column: &Column) -> Result<Column, ApiError>;
    fn delete(&self, ctx: &Context, dataset: &str, id: &str) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct Columns {
    executor: Arc<Executor>,
}

impl Columns {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

fn collection(dataset: &str) -> String {
    format!("1/columns/{}", dataset_segment(dataset))
}

fn member(dataset: &str, id: &str) -> String {
    format!("{}/{}", collection(dataset), segment(id))
}

impl ColumnsApi for Columns {
    fn list(&self, ctx: &Context, dataset: &str) -> Result<Vec<Column>, ApiError> {
        self.executor.get(ctx, &collection(dataset))
    }

    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<Column, ApiError> {
        self.executor.get(ctx, &member(dataset, id))
    }

    fn get_by_key_name(&self, ctx: &Context, dataset: &str, key_name: &str) -> Result<Column, ApiError> {
        self.executor
            .get(ctx, &with_param(&collection(dataset), "key_name", key_name))
    }

    fn create(&self, ctx: &Context, dataset: &str, column: &Column) -> Result<Column, ApiError> {
        self.executor.post(ctx, &collection(dataset), column)
    }

    fn update(&self, ctx: &Context, dataset: &str, id: &str, column: &Column) -> Result<Column, ApiError> {
        self.executor.put(ctx, &member(dataset, id), column)
    }

    fn delete(&self, ctx: &Context, dataset: &str, id: &str) -> Result<(), ApiError> {
        self.executor.delete(ctx, &member(dataset, id))
    }
}
