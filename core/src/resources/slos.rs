//! Service level objectives.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::resources::{dataset_segment, segment};

/// The derived column that classifies each event as good or bad.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliRef {
    pub alias: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub time_period_days: u32,
    /// Target success ratio scaled by one million; 99.9% is 999000.
    pub target_per_million: u32,
    #[serde(rename = "sli")]
    pub sli: SliRef,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<String>,
}

pub trait SlosApi {
    fn list(&self, ctx: &Context, dataset: &str) -> Result<Vec<Slo>, ApiError>;
    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<Slo, ApiError>;
    fn create(&self, ctx: &Context, dataset: &str, slo: &Slo) -> Result<Slo, ApiError>;
    fn update(&self, ctx: &Context, dataset: &str, id: &str, slo: &Slo) -> Result<Slo, ApiError>;
    fn delete(&self, ctx: &Context, dataset: &str, id: &str) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct Slos {
    executor: Arc<Executor>,
}

impl Slos {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

fn collection(dataset: &str) -> String {
    format!("1/slos/{}", dataset_segment(dataset))
}

fn member(dataset: &str, id: &str) -> String {
    format!("{}/{}", collection(dataset), segment(id))
}

impl SlosApi for Slos {
    fn list(&self, ctx: &Context, dataset: &str) -> Result<Vec<Slo>, ApiError> {
        self.executor.get(ctx, &collection(dataset))
    }

    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<Slo, ApiError> {
        self.executor.get(ctx, &member(dataset, id))
    }

    fn create(&self, ctx: &Context, dataset: &str, slo: &Slo) -> Result<Slo, ApiError> {
        self.executor.post(ctx, &collection(dataset), slo)
    }

    fn update(&self, ctx: &Context, dataset: &str, id: &str, slo: &Slo) -> Result<Slo, ApiError> {
        self.executor.put(ctx, &member(dataset, id), slo)
    }

    fn delete(&self, ctx: &Context, dataset: &str, id: &str) -> Result<(), ApiError> {
        self.executor.delete(ctx, &member(dataset, id))
    }
}
