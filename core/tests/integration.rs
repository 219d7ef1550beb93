//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port, so state and the
//! fault queue are never shared between tests. The client runs over real
//! HTTP through the default `ureq` transport with millisecond retry waits.

use std::time::{Duration, Instant};

use honeycombio::query::{CalculationOp, CalculationSpec, FilterCombination, FilterOp, FilterSpec};
use honeycombio::resources::auth::AuthApi;
use honeycombio::resources::boards::{Board, BoardsApi};
use honeycombio::resources::columns::{Column, ColumnType, ColumnsApi};
use honeycombio::resources::datasets::{Dataset, DatasetUpdate, DatasetsApi};
use honeycombio::resources::markers::{Marker, MarkersApi};
use honeycombio::resources::queries::QueriesApi;
use honeycombio::resources::query_results::{QueryResultRequest, QueryResults, QueryResultsApi};
use honeycombio::resources::recipients::{NotificationRecipient, RecipientType};
use honeycombio::resources::triggers::{Trigger, TriggerThreshold, TriggerThresholdOp, TriggersApi};
use honeycombio::{ApiError, Client, Config, Context, ContextError, NotFound, QuerySpec, RetryPolicy};

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        min_wait: Duration::from_millis(1),
        max_wait: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
}

fn client(base_url: &str) -> Client {
    Client::new(
        Config::new("test-key")
            .with_api_url(base_url)
            .with_retry(fast_retry())
            .with_timeout(Duration::from_secs(5)),
    )
    .unwrap()
}

/// Queue statuses the server answers with before reaching any handler.
fn push_faults(base_url: &str, statuses: &[u16]) {
    let body = serde_json::json!({ "statuses": statuses }).to_string();
    let response = ureq::post(&format!("{base_url}/__faults"))
        .content_type("application/json")
        .send(body.as_bytes())
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
}

#[test]
fn dataset_and_column_lifecycle() {
    let base = start_server();
    let client = client(&base);
    let ctx = Context::background();

    let dataset = client
        .datasets()
        .create(
            &ctx,
            &Dataset {
                name: "Checkout Service".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(dataset.slug, "checkout-service");

    let updated = client
        .datasets()
        .update(
            &ctx,
            &dataset.slug,
            &DatasetUpdate {
                description: Some("payments".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.description.as_deref(), Some("payments"));
    assert_eq!(client.datasets().list(&ctx).unwrap().len(), 1);

    let column = client
        .columns()
        .create(
            &ctx,
            &dataset.slug,
            &Column {
                key_name: "duration_ms".to_string(),
                column_type: Some(ColumnType::Float),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(!column.id.is_empty());

    let by_name = client
        .columns()
        .get_by_key_name(&ctx, &dataset.slug, "duration_ms")
        .unwrap();
    assert_eq!(by_name, column);

    client.columns().delete(&ctx, &dataset.slug, &column.id).unwrap();
    let err = client
        .columns()
        .get(&ctx, &dataset.slug, &column.id)
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status(), Some(404));
}

#[test]
fn board_lifecycle_ends_in_not_found() {
    let base = start_server();
    let client = client(&base);
    let ctx = Context::background();

    let created = client
        .boards()
        .create(
            &ctx,
            &Board {
                name: "Latency".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(created.links.is_some());

    let renamed = client
        .boards()
        .update(
            &ctx,
            &created.id,
            &Board {
                name: "Latency v2".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(renamed.name, "Latency v2");
    assert_eq!(client.boards().get(&ctx, &created.id).unwrap().name, "Latency v2");

    client.boards().delete(&ctx, &created.id).unwrap();
    let result = client.boards().get(&ctx, &created.id);
    assert!(result.as_ref().err().is_not_found());

    let err = client.boards().delete(&ctx, &created.id).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn validation_error_carries_field_details() {
    let base = start_server();
    let client = client(&base);

    let err = client
        .boards()
        .create(&Context::background(), &Board::default())
        .unwrap_err();

    let detailed = err.as_detailed().unwrap();
    assert_eq!(detailed.status, 422);
    assert_eq!(detailed.title, "Unprocessable Entity");
    assert_eq!(detailed.details.len(), 1);
    assert_eq!(err.to_string(), "missing name - name cannot be blank");
    assert!(!err.is_not_found());
}

#[test]
fn server_normalized_query_is_equivalent() {
    let base = start_server();
    let client = client(&base);
    let ctx = Context::background();

    let input = QuerySpec {
        filters: vec![
            FilterSpec::new("status_code", FilterOp::GreaterThanOrEqual, Some(500.0.into())).unwrap(),
            FilterSpec::unary("trace.parent_id", FilterOp::DoesNotExist).unwrap(),
        ],
        filter_combination: Some(FilterCombination::And),
        breakdowns: Some(vec![]),
        ..Default::default()
    };

    let created = client.queries().create(&ctx, "ds", &input).unwrap();
    assert_eq!(created.calculations, vec![CalculationSpec::count()]);
    assert!(created.filter_combination.is_none());
    assert_eq!(created.limit, Some(1000));
    assert!(created.equivalent_to(&input));
    assert!(input.equivalent_to(&created));

    let id = created.id.clone().unwrap();
    let fetched = client.queries().get(&ctx, "ds", &id).unwrap();
    assert!(fetched.equivalent_to(&input));

    let changed = QuerySpec {
        calculations: vec![CalculationSpec::of(CalculationOp::P99, "duration_ms")],
        ..input
    };
    assert!(!fetched.equivalent_to(&changed));
}

#[test]
fn query_result_polls_until_complete() {
    let base = start_server();
    let client = client(&base);
    let ctx = Context::background();

    let query = client
        .queries()
        .create(&ctx, "ds", &QuerySpec::default())
        .unwrap();
    let results = QueryResults::new(client.executor().clone()).with_poll_interval(Duration::from_millis(5));
    let pending = results
        .create(
            &ctx,
            "ds",
            &QueryResultRequest {
                query_id: query.id.unwrap(),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(!pending.complete);

    let done = results.get(&ctx, "ds", &pending.id).unwrap();
    assert!(done.complete);
    assert_eq!(done.data.results[0].data["COUNT"], 42);
    assert!(done.links.url.ends_with(&pending.id));
}

#[test]
fn trigger_is_shaped_before_sending() {
    let base = start_server();
    let client = client(&base);
    let ctx = Context::background();

    let trigger = Trigger {
        name: "errors".to_string(),
        query: Some(QuerySpec::default()),
        query_id: Some("q1".to_string()),
        frequency: Some(300),
        threshold: Some(TriggerThreshold {
            op: TriggerThresholdOp::GreaterThanOrEqual,
            value: 10.0,
            exceeded_limit: Some(2),
        }),
        recipients: vec![NotificationRecipient {
            id: Some("pd1".to_string()),
            recipient_type: RecipientType::PagerDuty,
            target: Some("routing-key".to_string()),
            details: None,
        }],
        ..Default::default()
    };

    // the server rejects both an inline query alongside query_id and a
    // PagerDuty target, so success here means both were stripped
    let created = client.triggers().create(&ctx, "ds", &trigger).unwrap();
    assert!(created.query.is_none());
    assert_eq!(created.query_id.as_deref(), Some("q1"));
    assert!(created.recipients[0].target.is_none());

    let listed = client.triggers().list(&ctx, "ds").unwrap();
    assert_eq!(listed, vec![created]);
}

#[test]
fn markers_are_found_through_the_list() {
    let base = start_server();
    let client = client(&base);
    let ctx = Context::background();

    let marker = client
        .markers()
        .create(
            &ctx,
            "ds",
            &Marker {
                message: "deploy 7".to_string(),
                marker_type: "deploy".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(client.markers().get(&ctx, "ds", &marker.id).unwrap().message, "deploy 7");

    client.markers().delete(&ctx, "ds", &marker.id).unwrap();
    assert!(client.markers().get(&ctx, "ds", &marker.id).unwrap_err().is_not_found());
}

#[test]
fn transient_statuses_are_retried() {
    let base = start_server();
    let client = client(&base);
    push_faults(&base, &[429, 502, 504]);

    let auth = client.auth().get(&Context::background()).unwrap();
    assert_eq!(auth.team.slug, "mock-team");
}

#[test]
fn retries_stop_at_attempt_cap() {
    let base = start_server();
    let client = client(&base);
    push_faults(&base, &[429; 16]);

    let err = client.auth().get(&Context::background()).unwrap_err();
    assert_eq!(err.status(), Some(429));

    // exactly one queued fault is left after the client's 15 attempts
    let agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent();
    let leftover = agent
        .get(&format!("{base}/1/auth"))
        .header("X-Honeycomb-Team", "test-key")
        .call()
        .unwrap();
    assert_eq!(leftover.status().as_u16(), 429);
    client.auth().get(&Context::background()).unwrap();
}

#[test]
fn other_errors_are_not_retried() {
    let base = start_server();
    let client = client(&base);
    push_faults(&base, &[500, 500]);

    let err = client.auth().get(&Context::background()).unwrap_err();
    assert_eq!(err.status(), Some(500));
    // the second fault is still queued
    let err = client.auth().get(&Context::background()).unwrap_err();
    assert_eq!(err.status(), Some(500));
    client.auth().get(&Context::background()).unwrap();
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::new(
        Config::new("test-key")
            .with_api_url(format!("http://{addr}"))
            .with_retry(RetryPolicy {
                max_attempts: 3,
                ..fast_retry()
            }),
    )
    .unwrap();
    let err = client.auth().get(&Context::background()).unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(!err.is_not_found());
}

#[test]
fn context_deadline_bounds_a_hung_request() {
    // accepts connections but never answers
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            held.push(stream);
        }
    });

    let client = Client::new(
        Config::new("test-key")
            .with_api_url(format!("http://{addr}"))
            .with_retry(fast_retry())
            .with_timeout(Duration::from_secs(8)),
    )
    .unwrap();

    let started = Instant::now();
    let err = client
        .auth()
        .get(&Context::with_timeout(Duration::from_millis(300)))
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    assert!(matches!(err, ApiError::Cancelled(ContextError::DeadlineExceeded)), "{err:?}");
}
