//! Triggers: alerts evaluated periodically against a query.
//!
//! # Design
//! A trigger refers to its query either inline (`query`) or by saved id
//! (`query_id`). The API rejects payloads that carry both, and rejects
//! PagerDuty recipients that carry a `target`. [`shape_trigger`] produces the
//! accepted form; `create` and `update` apply it before sending so callers
//! can hold a trigger in whatever form they read it back in.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::query::QuerySpec;
use crate::resources::recipients::NotificationRecipient;
use crate::resources::{dataset_segment, segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerThresholdOp {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerThreshold {
    pub op: TriggerThresholdOp,
    pub value: f64,
    /// Consecutive evaluations that must exceed the threshold before alerting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exceeded_limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerAlertType {
    #[default]
    OnChange,
    OnTrue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationScheduleType {
    Frequency,
    Window,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationWindow {
    /// Lowercase weekday names.
    pub days_of_week: Vec<String>,
    /// `HH:MM` in UTC.
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSchedule {
    pub window: EvaluationWindow,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QuerySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<TriggerAlertType>,
    /// Seconds between evaluations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<TriggerThreshold>,
    #[serde(default)]
    pub recipients: Vec<NotificationRecipient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_schedule_type: Option<EvaluationScheduleType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_schedule: Option<EvaluationSchedule>,
}

/// Returns the form of `trigger` the API accepts.
///
/// A non-empty `query_id` wins over an inline `query`, which is dropped.
/// Recipients are shaped with [`NotificationRecipient::shaped`].
pub fn shape_trigger(trigger: &Trigger) -> Trigger {
    let mut shaped = trigger.clone();
    if shaped.query_id.as_deref().is_some_and(|id| !id.is_empty()) {
        shaped.query = None;
    } else {
        shaped.query_id = None;
    }
    shaped.recipients = trigger.recipients.iter().map(NotificationRecipient::shaped).collect();
    shaped
}

pub trait TriggersApi {
    fn list(&self, ctx: &Context, dataset: &str) -> Result<Vec<Trigger>, ApiError>;
    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<Trigger, ApiError>;
    fn create(&self, ctx: &Context, dataset: &str, trigger: &Trigger) -> Result<Trigger, ApiError>;
    fn update(&self, ctx: &Context, dataset: &str, id: &str, trigger: &Trigger) -> Result<Trigger, ApiError>;
    fn delete(&self, ctx: &Context, dataset: &str, id: &str) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct Triggers {
    executor: Arc<Executor>,
}

impl Triggers {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

fn collection(dataset: &str) -> String {
    format!("1/triggers/{}", dataset_segment(dataset))
}

fn member(dataset: &str, id: &str) -> String {
    format!("{}/{}", collection(dataset), segment(id))
}

impl TriggersApi for Triggers {
    fn list(&self, ctx: &Context, dataset: &str) -> Result<Vec<Trigger>, ApiError> {
        self.executor.get(ctx, &collection(dataset))
    }

    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<Trigger, ApiError> {
        self.executor.get(ctx, &member(dataset, id))
    }

    fn create(&self, ctx: &Context, dataset: &str, trigger: &Trigger) -> Result<Trigger, ApiError> {
        self.executor
            .post(ctx, &collection(dataset), &shape_trigger(trigger))
    }

    fn update(&self, ctx: &Context, dataset: &str, id: &str, trigger: &Trigger) -> Result<Trigger, ApiError> {
        self.executor
            .put(ctx, &member(dataset, id), &shape_trigger(trigger))
    }

    fn delete(&self, ctx: &Context, dataset: &str, id: &str) -> Result<(), ApiError> {
        self.executor.delete(ctx, &member(dataset, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{CalculationOp, CalculationSpec};
    use crate::resources::recipients::RecipientType;
    use crate::resources::test_support::{body_json, executor};
    use crate::testing::{json_response, ScriptedTransport};

    fn inline_query() -> QuerySpec {
        QuerySpec {
            calculations: vec![CalculationSpec::of(CalculationOp::Avg, "duration_ms")],
            time_range: Some(900),
            ..Default::default()
        }
    }

    fn pagerduty() -> NotificationRecipient {
        NotificationRecipient {
            id: Some("pd1".to_string()),
            recipient_type: RecipientType::PagerDuty,
            target: Some("routing-key".to_string()),
            details: None,
        }
    }

    fn trigger() -> Trigger {
        Trigger {
            name: "slow requests".to_string(),
            query: Some(inline_query()),
            frequency: Some(900),
            threshold: Some(TriggerThreshold {
                op: TriggerThresholdOp::GreaterThan,
                value: 500.0,
                exceeded_limit: None,
            }),
            recipients: vec![pagerduty()],
            ..Default::default()
        }
    }

    #[test]
    fn shape_drops_inline_query_when_query_id_is_set() {
        let mut input = trigger();
        input.query_id = Some("q1".to_string());
        let shaped = shape_trigger(&input);
        assert!(shaped.query.is_none());
        assert_eq!(shaped.query_id.as_deref(), Some("q1"));
    }

    #[test]
    fn shape_keeps_inline_query_without_query_id() {
        let mut input = trigger();
        input.query_id = Some(String::new());
        let shaped = shape_trigger(&input);
        assert_eq!(shaped.query, Some(inline_query()));
        assert!(shaped.query_id.is_none());
    }

    #[test]
    fn shape_strips_pagerduty_target() {
        let mut input = trigger();
        input.recipients.push(NotificationRecipient {
            id: None,
            recipient_type: RecipientType::Slack,
            target: Some("#alerts".to_string()),
            details: None,
        });
        let shaped = shape_trigger(&input);
        assert_eq!(shaped.recipients[0].target, None);
        assert_eq!(shaped.recipients[1].target.as_deref(), Some("#alerts"));
        // the input is untouched
        assert_eq!(input.recipients[0].target.as_deref(), Some("routing-key"));
    }

    #[test]
    fn create_sends_shaped_trigger() {
        let transport = Arc::new(ScriptedTransport::new().then(Ok(json_response(
            201,
            r#"{
                "id": "t1",
                "name": "slow requests",
                "query_id": "q1",
                "frequency": 900,
                "threshold": {"op": ">", "value": 500},
                "recipients": [{"id": "pd1", "type": "pagerduty"}]
            }"#,
        ))));
        let triggers = Triggers::new(executor(Arc::clone(&transport)));
        let mut input = trigger();
        input.query_id = Some("q1".to_string());

        let created = triggers.create(&Context::background(), "ds", &input).unwrap();
        assert_eq!(created.id, "t1");
        assert_eq!(created.threshold.unwrap().op, TriggerThresholdOp::GreaterThan);

        let request = transport.last_request().unwrap();
        assert_eq!(request.url, "http://localhost:3000/1/triggers/ds");
        let body = body_json(&request);
        assert!(body.get("query").is_none());
        assert_eq!(body["query_id"], "q1");
        assert!(body["recipients"][0].get("target").is_none());
        assert_eq!(body["threshold"]["op"], ">");
    }

    #[test]
    fn evaluation_window_round_trips_wire_names() {
        let json = r#"{
            "name": "business hours",
            "evaluation_schedule_type": "window",
            "evaluation_schedule": {"window": {"days_of_week": ["monday"], "start_time": "09:00", "end_time": "17:00"}}
        }"#;
        let parsed: Trigger = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.evaluation_schedule_type, Some(EvaluationScheduleType::Window));
        let window = parsed.evaluation_schedule.unwrap().window;
        assert_eq!(window.days_of_week, vec!["monday"]);
        assert_eq!(window.start_time, "09:00");
    }
}
