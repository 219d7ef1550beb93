//! Markers: annotations on a dataset's timeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{ApiError, DetailedError};
use crate::executor::Executor;
use crate::resources::{dataset_segment, segment};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Unix seconds. Defaults to now on the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub marker_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing)]
    pub color: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<String>,
}

pub trait MarkersApi {
    fn list(&self, ctx: &Context, dataset: &str) -> Result<Vec<Marker>, ApiError>;
    /// The API has no single-marker endpoint; this scans the list.
    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<Marker, ApiError>;
    fn create(&self, ctx: &Context, dataset: &str, marker: &Marker) -> Result<Marker, ApiError>;
    fn update(&self, ctx: &Context, dataset: &str, id: &str, marker: &Marker) -> Result<Marker, ApiError>;
    fn delete(&self, ctx: &Context, dataset: &str, id: &str) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct Markers {
    executor: Arc<Executor>,
}

impl Markers {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

fn collection(dataset: &str) -> String {
    format!("1/markers/{}", dataset_segment(dataset))
}

fn member(dataset: &str, id: &str) -> String {
    format!("{}/{}", collection(dataset), segment(id))
}

impl MarkersApi for Markers {
    fn list(&self, ctx: &Context, dataset: &str) -> Result<Vec<Marker>, ApiError> {
        self.executor.get(ctx, &collection(dataset))
    }

    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<Marker, ApiError> {
        self.list(ctx, dataset)?
            .into_iter()
            .find(|marker| marker.id == id)
            .ok_or_else(|| {
                DetailedError {
                    status: 404,
                    message: format!("marker {id} not found"),
                    ..Default::default()
                }
                .into()
            })
    }

    fn create(&self, ctx: &Context, dataset: &str, marker: &Marker) -> Result<Marker, ApiError> {
        self.executor.post(ctx, &collection(dataset), marker)
    }

    fn update(&self, ctx: &Context, dataset: &str, id: &str, marker: &Marker) -> Result<Marker, ApiError> {
        self.executor.put(ctx, &member(dataset, id), marker)
    }

    fn delete(&self, ctx: &Context, dataset: &str, id: &str) -> Result<(), ApiError> {
        self.executor.delete(ctx, &member(dataset, id))
    }
}
