//! Notification recipients, and the references to them carried by triggers
//! and burn alerts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::resources::segment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    Email,
    Slack,
    #[serde(rename = "pagerduty")]
    PagerDuty,
    Webhook,
    #[serde(rename = "msteams")]
    MsTeams,
    Marker,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagerduty_integration_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagerduty_integration_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type")]
    pub recipient_type: RecipientType,
    #[serde(default)]
    pub details: RecipientDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PagerDutySeverity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagerduty_severity: Option<PagerDutySeverity>,
}

/// A recipient as referenced from a trigger or burn alert.
///
/// Either `id` names an existing recipient, or `recipient_type` and `target`
/// describe one inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecipient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub recipient_type: RecipientType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<NotificationDetails>,
}

impl NotificationRecipient {
    /// The form the API accepts: PagerDuty recipients are addressed by id
    /// only and must not carry a `target`.
    pub fn shaped(&self) -> Self {
        let mut shaped = self.clone();
        if shaped.recipient_type == RecipientType::PagerDuty {
            shaped.target = None;
        }
        shaped
    }
}

pub trait RecipientsApi {
    fn list(&self, ctx: &Context) -> Result<Vec<Recipient>, ApiError>;
    fn get(&self, ctx: &Context, id: &str) -> Result<Recipient, ApiError>;
    fn create(&self, ctx: &Context, recipient: &Recipient) -> Result<Recipient, ApiError>;
    fn update(&self, ctx: &Context, id: &str, recipient: &Recipient) -> Result<Recipient, ApiError>;
    fn delete(&self, ctx: &Context, id: &str) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct Recipients {
    executor: Arc<Executor>,
}

impl Recipients {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

fn member(id: &str) -> String {
    format!("1/recipients/{}", segment(id))
}

impl RecipientsApi for Recipients {
    fn list(&self, ctx: &Context) -> Result<Vec<Recipient>, ApiError> {
        self.executor.get(ctx, "1/recipients")
    }

    fn get(&self, ctx: &Context, id: &str) -> Result<Recipient, ApiError> {
        self.executor.get(ctx, &member(id))
    }

    fn create(&self, ctx: &Context, recipient: &Recipient) -> Result<Recipient, ApiError> {
        self.executor.post(ctx, "1/recipients", recipient)
    }

    fn update(&self, ctx: &Context, id: &str, recipient: &Recipient) -> Result<Recipient, ApiError> {
        self.executor.put(ctx, &member(id), recipient)
    }

    fn delete(&self, ctx: &Context, id: &str) -> Result<(), ApiError> {
        self.executor.delete(ctx, &member(id))
    }
}
