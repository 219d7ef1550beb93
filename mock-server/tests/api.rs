use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::{json, Value};
use tower::ServiceExt;

const KEY: &str = "test-key";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Honeycomb-Team", KEY)
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("X-Honeycomb-Team", KEY)
        .body(body.to_string())
        .unwrap()
}

async fn send(app: &Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

// --- auth ---

#[tokio::test]
async fn missing_api_key_returns_401() {
    let resp = app()
        .oneshot(Request::builder().uri("/1/auth").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["status"], 401);
    assert!(body["error"].as_str().unwrap().contains("API key"));
}

#[tokio::test]
async fn auth_describes_team_and_environment() {
    let resp = app().oneshot(request("GET", "/1/auth")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["team"]["slug"], "mock-team");
    assert_eq!(body["api_key_access"]["boards"], true);
}

// --- datasets ---

#[tokio::test]
async fn create_dataset_assigns_slug() {
    let app = app();
    let resp = send(&app, json_request("POST", "/1/datasets", json!({"name": "My Service"}))).await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["slug"], "my-service");

    let resp = send(&app, request("GET", "/1/datasets/my-service")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["name"], "My Service");
}

#[tokio::test]
async fn create_dataset_without_name_returns_type_detail() {
    let resp = app()
        .oneshot(json_request("POST", "/1/datasets", json!({"description": "x"})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        resp.headers()[http::header::CONTENT_TYPE],
        "application/problem+json"
    );
    let body = body_json(resp).await;
    assert_eq!(body["status"], 422);
    assert_eq!(body["title"], "Unprocessable Entity");
    assert_eq!(body["type_detail"][0]["code"], "missing");
    assert_eq!(body["type_detail"][0]["field"], "name");
}

#[tokio::test]
async fn delete_protected_dataset_returns_409() {
    let app = app();
    send(
        &app,
        json_request(
            "POST",
            "/1/datasets",
            json!({"name": "keep", "settings": {"delete_protected": true}}),
        ),
    )
    .await;

    let resp = send(&app, request("DELETE", "/1/datasets/keep")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// --- columns ---

#[tokio::test]
async fn column_lookup_by_key_name() {
    let app = app();
    send(
        &app,
        json_request("POST", "/1/columns/ds", json!({"key_name": "duration_ms", "type": "float"})),
    )
    .await;

    let resp = send(&app, request("GET", "/1/columns/ds?key_name=duration_ms")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["type"], "float");
    assert_eq!(body["hidden"], false);

    let resp = send(&app, request("GET", "/1/columns/ds?key_name=missing")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- boards ---

#[tokio::test]
async fn board_crud_lifecycle() {
    let app = app();
    let resp = send(&app, json_request("POST", "/1/boards", json!({"name": "Ops", "queries": []}))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert!(created["links"]["board_url"].as_str().unwrap().ends_with(&id));

    let resp = send(
        &app,
        json_request("PUT", &format!("/1/boards/{id}"), json!({"name": "Ops v2", "queries": []})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["name"], "Ops v2");

    let resp = send(&app, request("DELETE", &format!("/1/boards/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(&app, request("GET", &format!("/1/boards/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["status"], 404);
}

// --- queries ---

#[tokio::test]
async fn created_query_is_normalized() {
    let app = app();
    let resp = send(
        &app,
        json_request(
            "POST",
            "/1/queries/ds",
            json!({"filters": [{"column": "a", "op": "exists"}], "filter_combination": "AND"}),
        ),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["calculations"], json!([{"op": "COUNT"}]));
    assert!(body.get("filter_combination").is_none());
    assert_eq!(body["limit"], 1000);
    assert_eq!(body["time_range"], 7200);

    let id = body["id"].as_str().unwrap();
    let resp = send(&app, request("GET", &format!("/1/queries/ds/{id}"))).await;
    assert_eq!(body_json(resp).await, body);
}

#[tokio::test]
async fn query_result_completes_after_polling() {
    let app = app();
    let query = body_json(send(&app, json_request("POST", "/1/queries/ds", json!({}))).await).await;
    let resp = send(
        &app,
        json_request("POST", "/1/query_results/ds", json!({"query_id": query["id"]})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let result = body_json(resp).await;
    let uri = format!("/1/query_results/ds/{}", result["id"].as_str().unwrap());

    let first = body_json(send(&app, request("GET", &uri)).await).await;
    assert_eq!(first["complete"], false);
    let second = body_json(send(&app, request("GET", &uri)).await).await;
    assert_eq!(second["complete"], true);
    assert_eq!(second["data"]["results"][0]["data"]["COUNT"], 42);
}

// --- triggers ---

#[tokio::test]
async fn trigger_with_pagerduty_target_is_rejected() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/1/triggers/ds",
            json!({
                "name": "t",
                "query_id": "q1",
                "recipients": [{"id": "pd1", "type": "pagerduty", "target": "key"}],
            }),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- faults ---

#[tokio::test]
async fn queued_faults_answer_before_handlers() {
    let app = app();
    let resp = send(
        &app,
        json_request("POST", "/__faults", json!({"statuses": [429, 502], "retry_after": 1})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(&app, request("GET", "/1/auth")).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers()["retry-after"], "1");

    let resp = send(&app, request("GET", "/1/auth")).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let resp = send(&app, request("GET", "/1/auth")).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_fault_status_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", "/__faults", json!({"statuses": [42]})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
