//! In-memory emulation of the Honeycomb API surface the client drives in
//! integration tests.
//!
//! # Design
//! - Records are stored as JSON objects keyed by collection path
//!   (`columns/{dataset}`, `boards`, ...), so one small store serves every
//!   resource. Handlers only add the behavior the real API has on top of
//!   plain CRUD: slugs for datasets, query normalization, result polling.
//! - Errors are RFC7807 problem documents carrying `status`, `error`,
//!   `title` and, for validation failures, a `type_detail` list.
//! - A fault queue (`POST /__faults`) makes the next N API requests answer
//!   with the queued statuses before they reach any handler. It is how the
//!   retry path is driven over real HTTP.
//! - Every `/1/*` route requires a non-empty `X-Honeycomb-Team` header.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const API_KEY_HEADER: &str = "x-honeycomb-team";

/// Polls of a query result that report `complete: false` before it completes.
pub const PENDING_POLLS: u32 = 1;

type Record = Map<String, Value>;

#[derive(Default)]
struct Store {
    collections: HashMap<String, Vec<Record>>,
    /// Query result id to the number of polls served so far.
    result_polls: HashMap<String, u32>,
}

impl Store {
    fn list(&self, collection: &str) -> Vec<Record> {
        self.collections.get(collection).cloned().unwrap_or_default()
    }

    fn find(&self, collection: &str, key: &str, value: &str) -> Option<Record> {
        self.collections
            .get(collection)?
            .iter()
            .find(|record| record.get(key).and_then(Value::as_str) == Some(value))
            .cloned()
    }

    fn get(&self, collection: &str, id: &str) -> Option<Record> {
        self.find(collection, "id", id)
    }

    /// Assigns an id unless the record already carries one.
    fn insert(&mut self, collection: &str, mut record: Record) -> Record {
        record
            .entry("id")
            .or_insert_with(|| Value::String(short_id()));
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    fn replace(&mut self, collection: &str, id: &str, mut record: Record) -> Option<Record> {
        let slot = self
            .collections
            .get_mut(collection)?
            .iter_mut()
            .find(|existing| existing.get("id").and_then(Value::as_str) == Some(id))?;
        record.insert("id".to_string(), Value::String(id.to_string()));
        *slot = record.clone();
        Some(record)
    }

    fn remove(&mut self, collection: &str, id: &str) -> bool {
        let Some(records) = self.collections.get_mut(collection) else {
            return false;
        };
        let before = records.len();
        records.retain(|record| record.get("id").and_then(Value::as_str) != Some(id));
        records.len() != before
    }
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    status: StatusCode,
    retry_after: Option<u64>,
}

/// Shared state behind every handler.
#[derive(Clone, Default)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    faults: Arc<Mutex<VecDeque<Fault>>>,
}

impl AppState {
    fn next_fault(&self) -> Option<Fault> {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

pub fn app() -> Router {
    let state = AppState::default();
    Router::new()
        .route("/1/auth", get(auth))
        .route("/1/datasets", get(list_datasets).post(create_dataset))
        .route(
            "/1/datasets/{slug}",
            get(get_dataset).put(update_dataset).delete(delete_dataset),
        )
        .route("/1/columns/{dataset}", get(list_columns).post(create_column))
        .route(
            "/1/columns/{dataset}/{id}",
            get(get_column).put(update_column).delete(delete_column),
        )
        .route("/1/markers/{dataset}", get(list_markers).post(create_marker))
        .route(
            "/1/markers/{dataset}/{id}",
            axum::routing::put(update_marker).delete(delete_marker),
        )
        .route("/1/boards", get(list_boards).post(create_board))
        .route(
            "/1/boards/{id}",
            get(get_board).put(update_board).delete(delete_board),
        )
        .route("/1/queries/{dataset}", post(create_query))
        .route("/1/queries/{dataset}/{id}", get(get_query))
        .route("/1/query_results/{dataset}", post(create_query_result))
        .route("/1/query_results/{dataset}/{id}", get(get_query_result))
        .route("/1/triggers/{dataset}", get(list_triggers).post(create_trigger))
        .route(
            "/1/triggers/{dataset}/{id}",
            get(get_trigger).put(update_trigger).delete(delete_trigger),
        )
        .layer(middleware::from_fn(require_api_key))
        .layer(middleware::from_fn_with_state(state.clone(), inject_faults))
        .route("/__faults", post(push_faults))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    info!(addr = ?listener.local_addr().ok(), "mock server listening");
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An RFC7807 problem document.
#[derive(Debug)]
pub struct Problem {
    status: StatusCode,
    message: String,
    details: Vec<Value>,
}

impl Problem {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: Vec::new(),
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    fn missing(field: &str) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "The provided input is invalid.".to_string(),
            details: vec![json!({
                "code": "missing",
                "field": field,
                "description": format!("{field} cannot be blank"),
            })],
        }
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let title = self.status.canonical_reason().unwrap_or_default();
        let mut body = json!({
            "status": self.status.as_u16(),
            "type": format!("https://api.honeycomb.io/problems/{}", self.status.as_u16()),
            "title": title,
            "error": self.message,
        });
        if !self.details.is_empty() {
            body["type_detail"] = Value::Array(self.details);
        }
        let mut response = (self.status, Json(body)).into_response();
        response.headers_mut().insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

type ApiResult<T> = Result<T, Problem>;

fn require_string(record: &Record, field: &str) -> ApiResult<()> {
    match record.get(field).and_then(Value::as_str) {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(Problem::missing(field)),
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..11].to_string()
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

async fn require_api_key(request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(API_KEY_HEADER)
        .is_some_and(|value| !value.is_empty());
    if !authorized {
        return Problem::new(
            StatusCode::UNAUTHORIZED,
            "unknown API key - check your credentials",
        )
        .into_response();
    }
    next.run(request).await
}

async fn inject_faults(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(fault) = state.next_fault() else {
        return next.run(request).await;
    };
    debug!(status = fault.status.as_u16(), uri = %request.uri(), "injecting fault");
    let mut response = Problem::new(
        fault.status,
        fault.status.canonical_reason().unwrap_or("injected fault"),
    )
    .into_response();
    if let Some(seconds) = fault.retry_after {
        response
            .headers_mut()
            .insert("retry-after", HeaderValue::from(seconds));
    }
    response
}

#[derive(Debug, Deserialize)]
pub struct FaultRequest {
    pub statuses: Vec<u16>,
    #[serde(default)]
    pub retry_after: Option<u64>,
}

async fn push_faults(
    State(state): State<AppState>,
    Json(input): Json<FaultRequest>,
) -> ApiResult<StatusCode> {
    let faults = input
        .statuses
        .iter()
        .map(|&code| {
            StatusCode::from_u16(code)
                .map(|status| Fault {
                    status,
                    retry_after: input.retry_after,
                })
                .map_err(|_| Problem::new(StatusCode::BAD_REQUEST, format!("invalid status {code}")))
        })
        .collect::<ApiResult<Vec<_>>>()?;
    state
        .faults
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .extend(faults);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

async fn auth() -> Json<Value> {
    Json(json!({
        "id": "mock-key",
        "type": "configuration",
        "api_key_access": {
            "events": true, "markers": true, "triggers": true, "boards": true,
            "queries": true, "columns": true, "create_datasets": true,
            "slos": true, "recipients": true,
        },
        "environment": {"name": "Test", "slug": "test"},
        "team": {"name": "Mock Team", "slug": "mock-team"},
    }))
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

const DATASETS: &str = "datasets";

fn dataset_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

async fn list_datasets(State(state): State<AppState>) -> Json<Vec<Record>> {
    Json(state.store.read().await.list(DATASETS))
}

async fn get_dataset(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Record>> {
    state
        .store
        .read()
        .await
        .find(DATASETS, "slug", &slug)
        .map(Json)
        .ok_or_else(|| Problem::not_found("Dataset"))
}

async fn create_dataset(
    State(state): State<AppState>,
    Json(mut input): Json<Record>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    require_string(&input, "name")?;
    let name = input.get("name").and_then(Value::as_str).unwrap_or_default();
    let slug = dataset_slug(name);
    let mut store = state.store.write().await;
    // creating an existing dataset returns it unchanged
    if let Some(existing) = store.find(DATASETS, "slug", &slug) {
        return Ok((StatusCode::OK, Json(existing)));
    }
    input.insert("slug".to_string(), Value::String(slug.clone()));
    input.insert("id".to_string(), Value::String(slug));
    Ok((StatusCode::CREATED, Json(store.insert(DATASETS, input))))
}

async fn update_dataset(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(input): Json<Record>,
) -> ApiResult<Json<Record>> {
    let mut store = state.store.write().await;
    let mut dataset = store
        .find(DATASETS, "slug", &slug)
        .ok_or_else(|| Problem::not_found("Dataset"))?;
    for (key, value) in input {
        if key != "name" && key != "slug" {
            dataset.insert(key, value);
        }
    }
    store
        .replace(DATASETS, &slug, dataset)
        .map(Json)
        .ok_or_else(|| Problem::not_found("Dataset"))
}

async fn delete_dataset(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    let mut store = state.store.write().await;
    let protected = store
        .find(DATASETS, "slug", &slug)
        .ok_or_else(|| Problem::not_found("Dataset"))?
        .get("settings")
        .and_then(|settings| settings.get("delete_protected"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if protected {
        return Err(Problem::new(
            StatusCode::CONFLICT,
            "Delete protection is enabled for this dataset.",
        ));
    }
    store.remove(DATASETS, &slug);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ColumnFilter {
    pub key_name: Option<String>,
}

fn columns_of(dataset: &str) -> String {
    format!("columns/{dataset}")
}

async fn list_columns(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    Query(filter): Query<ColumnFilter>,
) -> ApiResult<Response> {
    let store = state.store.read().await;
    let collection = columns_of(&dataset);
    match filter.key_name {
        Some(key_name) => store
            .find(&collection, "key_name", &key_name)
            .map(|column| Json(column).into_response())
            .ok_or_else(|| Problem::not_found("Column")),
        None => Ok(Json(store.list(&collection)).into_response()),
    }
}

async fn get_column(
    State(state): State<AppState>,
    Path((dataset, id)): Path<(String, String)>,
) -> ApiResult<Json<Record>> {
    state
        .store
        .read()
        .await
        .get(&columns_of(&dataset), &id)
        .map(Json)
        .ok_or_else(|| Problem::not_found("Column"))
}

async fn create_column(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    Json(mut input): Json<Record>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    require_string(&input, "key_name")?;
    input
        .entry("type")
        .or_insert_with(|| Value::String("string".to_string()));
    input.entry("hidden").or_insert(Value::Bool(false));
    let mut store = state.store.write().await;
    Ok((
        StatusCode::CREATED,
        Json(store.insert(&columns_of(&dataset), input)),
    ))
}

async fn update_column(
    State(state): State<AppState>,
    Path((dataset, id)): Path<(String, String)>,
    Json(input): Json<Record>,
) -> ApiResult<Json<Record>> {
    require_string(&input, "key_name")?;
    state
        .store
        .write()
        .await
        .replace(&columns_of(&dataset), &id, input)
        .map(Json)
        .ok_or_else(|| Problem::not_found("Column"))
}

async fn delete_column(
    State(state): State<AppState>,
    Path((dataset, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    if state.store.write().await.remove(&columns_of(&dataset), &id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Problem::not_found("Column"))
    }
}

// ---------------------------------------------------------------------------
// Markers
// ---------------------------------------------------------------------------

fn markers_of(dataset: &str) -> String {
    format!("markers/{dataset}")
}

async fn list_markers(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
) -> Json<Vec<Record>> {
    Json(state.store.read().await.list(&markers_of(&dataset)))
}

async fn create_marker(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    Json(input): Json<Record>,
) -> (StatusCode, Json<Record>) {
    let record = state
        .store
        .write()
        .await
        .insert(&markers_of(&dataset), input);
    (StatusCode::CREATED, Json(record))
}

async fn update_marker(
    State(state): State<AppState>,
    Path((dataset, id)): Path<(String, String)>,
    Json(input): Json<Record>,
) -> ApiResult<Json<Record>> {
    state
        .store
        .write()
        .await
        .replace(&markers_of(&dataset), &id, input)
        .map(Json)
        .ok_or_else(|| Problem::not_found("Marker"))
}

async fn delete_marker(
    State(state): State<AppState>,
    Path((dataset, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    if state.store.write().await.remove(&markers_of(&dataset), &id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Problem::not_found("Marker"))
    }
}

// ---------------------------------------------------------------------------
// Boards
// ---------------------------------------------------------------------------

const BOARDS: &str = "boards";

fn with_board_links(mut board: Record) -> Record {
    let id = board.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    board.insert(
        "links".to_string(),
        json!({"board_url": format!("https://ui.honeycomb.io/mock-team/board/{id}")}),
    );
    board
}

async fn list_boards(State(state): State<AppState>) -> Json<Vec<Record>> {
    Json(state.store.read().await.list(BOARDS))
}

async fn get_board(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Record>> {
    state
        .store
        .read()
        .await
        .get(BOARDS, &id)
        .map(Json)
        .ok_or_else(|| Problem::not_found("Board"))
}

async fn create_board(
    State(state): State<AppState>,
    Json(input): Json<Record>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    require_string(&input, "name")?;
    let mut store = state.store.write().await;
    let board = store.insert(BOARDS, input);
    let board = with_board_links(board);
    let id = board.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    store.replace(BOARDS, &id, board.clone());
    Ok((StatusCode::CREATED, Json(board)))
}

async fn update_board(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut input): Json<Record>,
) -> ApiResult<Json<Record>> {
    require_string(&input, "name")?;
    input.insert("id".to_string(), Value::String(id.clone()));
    state
        .store
        .write()
        .await
        .replace(BOARDS, &id, with_board_links(input))
        .map(Json)
        .ok_or_else(|| Problem::not_found("Board"))
}

async fn delete_board(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    if state.store.write().await.remove(BOARDS, &id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Problem::not_found("Board"))
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn queries_of(dataset: &str) -> String {
    format!("queries/{dataset}")
}

/// Rewrite a query the way the API echoes it back: explicit defaults filled
/// in, an implicit `COUNT` made explicit, and redundant fields dropped.
pub fn normalize_query(mut query: Map<String, Value>) -> Map<String, Value> {
    let no_calculations = query
        .get("calculations")
        .and_then(Value::as_array)
        .map_or(true, |calculations| calculations.is_empty());
    if no_calculations {
        query.insert("calculations".to_string(), json!([{"op": "COUNT"}]));
    }
    if query.get("filter_combination").and_then(Value::as_str) == Some("AND") {
        query.remove("filter_combination");
    }
    if query
        .get("breakdowns")
        .and_then(Value::as_array)
        .is_some_and(|breakdowns| breakdowns.is_empty())
    {
        query.remove("breakdowns");
    }
    let absolute = query.contains_key("start_time") && query.contains_key("end_time");
    if !absolute {
        query.entry("time_range").or_insert(json!(7200));
    }
    query.entry("limit").or_insert(json!(1000));
    query.entry("granularity").or_insert(json!(0));
    query
}

async fn create_query(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    Json(input): Json<Record>,
) -> ApiResult<Json<Record>> {
    if ["time_range", "start_time", "end_time"]
        .iter()
        .all(|key| input.contains_key(*key))
    {
        return Err(Problem::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "specify at most two of time_range, start_time and end_time",
        ));
    }
    let mut store = state.store.write().await;
    Ok(Json(store.insert(&queries_of(&dataset), normalize_query(input))))
}

async fn get_query(
    State(state): State<AppState>,
    Path((dataset, id)): Path<(String, String)>,
) -> ApiResult<Json<Record>> {
    state
        .store
        .read()
        .await
        .get(&queries_of(&dataset), &id)
        .map(Json)
        .ok_or_else(|| Problem::not_found("Query"))
}

// ---------------------------------------------------------------------------
// Query results
// ---------------------------------------------------------------------------

fn query_results_of(dataset: &str) -> String {
    format!("query_results/{dataset}")
}

async fn create_query_result(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    Json(input): Json<Record>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    require_string(&input, "query_id")?;
    let query_id = input.get("query_id").and_then(Value::as_str).unwrap_or_default();
    let mut store = state.store.write().await;
    if store.get(&queries_of(&dataset), query_id).is_none() {
        return Err(Problem::not_found("Query"));
    }
    let mut result = Record::new();
    result.insert("query_id".to_string(), Value::String(query_id.to_string()));
    result.insert("complete".to_string(), Value::Bool(false));
    let result = store.insert(&query_results_of(&dataset), result);
    if let Some(id) = result.get("id").and_then(Value::as_str) {
        store.result_polls.insert(id.to_string(), 0);
    }
    Ok((StatusCode::CREATED, Json(result)))
}

async fn get_query_result(
    State(state): State<AppState>,
    Path((dataset, id)): Path<(String, String)>,
) -> ApiResult<Json<Record>> {
    let mut store = state.store.write().await;
    let mut result = store
        .get(&query_results_of(&dataset), &id)
        .ok_or_else(|| Problem::not_found("Query result"))?;
    let polls = store.result_polls.entry(id.clone()).or_insert(0);
    *polls += 1;
    if *polls > PENDING_POLLS {
        result.insert("complete".to_string(), Value::Bool(true));
        result.insert(
            "data".to_string(),
            json!({"series": [], "results": [{"data": {"COUNT": 42}}]}),
        );
        result.insert(
            "links".to_string(),
            json!({
                "query_url": format!("https://ui.honeycomb.io/mock-team/result/{id}"),
                "graph_image_url": format!("https://ui.honeycomb.io/mock-team/result/{id}/graph"),
            }),
        );
    }
    Ok(Json(result))
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

fn triggers_of(dataset: &str) -> String {
    format!("triggers/{dataset}")
}

fn validate_trigger(trigger: &Record) -> ApiResult<()> {
    require_string(trigger, "name")?;
    if trigger.contains_key("query") && trigger.contains_key("query_id") {
        return Err(Problem::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "only one of query and query_id may be set",
        ));
    }
    let pagerduty_with_target = trigger
        .get("recipients")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .any(|recipient| recipient["type"] == "pagerduty" && recipient.get("target").is_some());
    if pagerduty_with_target {
        return Err(Problem::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "pagerduty recipients cannot set a target",
        ));
    }
    Ok(())
}

async fn list_triggers(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
) -> Json<Vec<Record>> {
    Json(state.store.read().await.list(&triggers_of(&dataset)))
}

async fn get_trigger(
    State(state): State<AppState>,
    Path((dataset, id)): Path<(String, String)>,
) -> ApiResult<Json<Record>> {
    state
        .store
        .read()
        .await
        .get(&triggers_of(&dataset), &id)
        .map(Json)
        .ok_or_else(|| Problem::not_found("Trigger"))
}

async fn create_trigger(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
    Json(input): Json<Record>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    validate_trigger(&input)?;
    let record = state
        .store
        .write()
        .await
        .insert(&triggers_of(&dataset), input);
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_trigger(
    State(state): State<AppState>,
    Path((dataset, id)): Path<(String, String)>,
    Json(input): Json<Record>,
) -> ApiResult<Json<Record>> {
    validate_trigger(&input)?;
    state
        .store
        .write()
        .await
        .replace(&triggers_of(&dataset), &id, input)
        .map(Json)
        .ok_or_else(|| Problem::not_found("Trigger"))
}

async fn delete_trigger(
    State(state): State<AppState>,
    Path((dataset, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    if state.store.write().await.remove(&triggers_of(&dataset), &id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Problem::not_found("Trigger"))
    }
}
