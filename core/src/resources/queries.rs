//! Saved queries.
//!
//! Queries are immutable once created. The server returns a normalized copy;
//! use [`QuerySpec::equivalent_to`] to compare it with what was sent.

use std::sync::Arc;

use crate::context::Context;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::query::QuerySpec;
use crate::resources::{dataset_segment, segment};

pub trait QueriesApi {
    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<QuerySpec, ApiError>;
    /// Validates the query locally before sending it.
    fn create(&self, ctx: &Context, dataset: &str, query: &QuerySpec) -> Result<QuerySpec, ApiError>;
}

#[derive(Clone)]
pub struct Queries {
    executor: Arc<Executor>,
}

impl Queries {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

impl QueriesApi for Queries {
    fn get(&self, ctx: &Context, dataset: &str, id: &str) -> Result<QuerySpec, ApiError> {
        self.executor.get(
            ctx,
            &format!("1/queries/{}/{}", dataset_segment(dataset), segment(id)),
        )
    }

    fn create(&self, ctx: &Context, dataset: &str, query: &QuerySpec) -> Result<QuerySpec, ApiError> {
        query.validate()?;
        self.executor
            .post(ctx, &format!("1/queries/{}", dataset_segment(dataset)), query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{CalculationOp, CalculationSpec};
    use crate::resources::test_support::{body_json, executor};
    use crate::testing::{json_response, ScriptedTransport};

    #[test]
    fn created_query_is_equivalent_to_input() {
        let transport = Arc::new(ScriptedTransport::new().then(Ok(json_response(
            200,
            r#"{"id":"q1","calculations":[{"op":"P99","column":"duration_ms"}],"limit":1000,"time_range":7200,"granularity":0}"#,
        ))));
        let queries = Queries::new(executor(Arc::clone(&transport)));
        let input = QuerySpec {
            calculations: vec![CalculationSpec::of(CalculationOp::P99, "duration_ms")],
            ..Default::default()
        };
        let created = queries.create(&Context::background(), "ds", &input).unwrap();
        assert_eq!(created.id.as_deref(), Some("q1"));
        assert!(created.equivalent_to(&input));

        let request = transport.last_request().unwrap();
        assert_eq!(request.url, "http://localhost:3000/1/queries/ds");
        assert!(body_json(&request).get("limit").is_none());
    }

    #[test]
    fn invalid_query_is_rejected_before_sending() {
        let transport = Arc::new(ScriptedTransport::new());
        let queries = Queries::new(executor(Arc::clone(&transport)));
        let input = QuerySpec {
            time_range: Some(3600),
            start_time: Some(1),
            end_time: Some(2),
            ..Default::default()
        };
        let err = queries.create(&Context::background(), "ds", &input).unwrap_err();
        assert!(matches!(err, ApiError::InvalidQuery(_)));
        assert_eq!(transport.attempts(), 0);
    }
}
