//! Burn alerts: notifications on the rate an SLO consumes its error budget.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::resources::recipients::NotificationRecipient;
use crate::resources::{dataset_segment, segment, with_param};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnAlertType {
    /// Fires when the budget is projected to run out within `exhaustion_minutes`.
    #[default]
    ExhaustionTime,
    /// Fires when the budget drops by more than a threshold within a window.
    BudgetRate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SloRef {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnAlert {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub alert_type: BurnAlertType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exhaustion_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_rate_window_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_rate_decrease_threshold_per_million: Option<u32>,
    pub slo: SloRef,
    #[serde(default)]
    pub recipients: Vec<NotificationRecipient>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub updated_at: Option<String>,
}

impl BurnAlert {
    /// Drops the fields that belong to the other alert type and shapes
    /// recipients.
    fn shaped(&self) -> Self {
        let mut shaped = self.clone();
        match shaped.alert_type {
            BurnAlertType::ExhaustionTime => {
                shaped.budget_rate_window_minutes = None;
                shaped.budget_rate_decrease_threshold_per_million = None;
            }
            BurnAlertType::BudgetRate => shaped.exhaustion_minutes = None,
        }
        shaped.recipients = self.recipients.iter().map(NotificationRecipient::shaped).collect();
        shaped
    }
}

pub trait BurnAlertsApi {
    fn list_for_slo(&self, ctx: &Context, dataset: &str, slo_id: &str) -> Result<Vec<BurnAlert>, ApiError>;
    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<BurnAlert, ApiError>;
    fn create(&self, ctx: &Context, dataset: &str, alert: &BurnAlert) -> Result<BurnAlert, ApiError>;
    fn update(&self, ctx: &Context, dataset: &str, id: &str, alert: &BurnAlert) -> Result<BurnAlert, ApiError>;
    fn delete(&self, ctx: &Context, dataset: &str, id: &str) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct BurnAlerts {
    executor: Arc<Executor>,
}

impl BurnAlerts {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

fn collection(dataset: &str) -> String {
    format!("1/burn_alerts/{}", dataset_segment(dataset))
}

fn member(dataset: &str, id: &str) -> String {
    format!("{}/{}", collection(dataset), segment(id))
}

impl BurnAlertsApi for BurnAlerts {
    fn list_for_slo(&self, ctx: &Context, dataset: &str, slo_id: &str) -> Result<Vec<BurnAlert>, ApiError> {
        self.executor
            .get(ctx, &with_param(&collection(dataset), "slo_id", slo_id))
    }

    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<BurnAlert, ApiError> {
        self.executor.get(ctx, &member(dataset, id))
    }

    fn create(&self, ctx: &Context, dataset: &str, alert: &BurnAlert) -> Result<BurnAlert, ApiError> {
        self.executor.post(ctx, &collection(dataset), &alert.shaped())
    }

    fn update(&self, ctx: &Context, dataset: &str, id: &str, alert: &BurnAlert) -> Result<BurnAlert, ApiError> {
        self.executor.put(ctx, &member(dataset, id), &alert.shaped())
    }

    fn delete(&self, ctx: &Context, dataset: &str, id: &str) -> Result<(), ApiError> {
        self.executor.delete(ctx, &member(dataset, id))
    }
}
