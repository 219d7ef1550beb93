//! Boards: curated collections of saved queries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ApiError;
use crate::executor::Executor;
use crate::resources::segment;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardStyle {
    #[default]
    List,
    Visual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardColumnLayout {
    #[default]
    Multi,
    Single,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardQueryStyle {
    #[default]
    Graph,
    Table,
    Combo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardQuery {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_style: Option<BoardQueryStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    pub query_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_annotation_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardLinks {
    #[serde(default)]
    pub board_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<BoardStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_layout: Option<BoardColumnLayout>,
    #[serde(default)]
    pub queries: Vec<BoardQuery>,
    #[serde(default, skip_serializing)]
    pub links: Option<BoardLinks>,
}

pub trait BoardsApi {
    fn list(&self, ctx: &Context) -> Result<Vec<Board>, ApiError>;
    fn get(&self, ctx: &Context, id: &str) -> Result<Board, ApiError>;
    fn create(&self, ctx: &Context, board: &Board) -> Result<Board, ApiError>;
    fn update(&self, ctx: &Context, id: &str, board: &Board) -> Result<Board, ApiError>;
    fn delete(&self, ctx: &Context, id: &str) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct Boards {
    executor: Arc<Executor>,
}

impl Boards {
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }
}

fn member(id: &str) -> String {
    format!("1/boards/{}", segment(id))
}

impl BoardsApi for Boards {
    fn list(&self, ctx: &Context) -> Result<Vec<Board>, ApiError> {
        self.executor.get(ctx, "1/boards")
    }

    fn get(&self, ctx: &Context, id: &str) -> Result<Board, ApiError> {
        self.executor.get(ctx, &member(id))
    }

    fn create(&self, ctx: &Context, board: &Board) -> Result<Board, ApiError> {
        self.executor.post(ctx, "1/boards", board)
    }

    fn update(&self, ctx: &Context, id: &str, board: &Board) -> Result<Board, ApiError> {
        self.executor.put(ctx, &member(id), board)
    }

    fn delete(&self, ctx: &Context, id: &str) -> Result<(), ApiError> {
        self.executor.delete(ctx, &member(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::resources::test_support::{body_json, executor};
    use crate::testing::{json_response, ScriptedTransport};

    #[test]
    fn create_sends_queries_and_reads_links() {
        let transport = Arc::new(ScriptedTransport::new().then(Ok(json_response(
            201,
            r#"{
                "id": "b1",
                "name": "Latency",
                "style": "visual",
                "queries": [{"caption": "p99", "query_id": "q1", "query_style": "combo"}],
                "links": {"board_url": "https://ui.honeycomb.io/acme/board/b1"}
            }"#,
        ))));
        let boards = Boards::new(executor(Arc::clone(&transport)));
        let input = Board {
            name: "Latency".to_string(),
            style: Some(BoardStyle::Visual),
            queries: vec![BoardQuery {
                caption: "p99".to_string(),
                query_style: Some(BoardQueryStyle::Combo),
                query_id: "q1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let created = boards.create(&Context::background(), &input).unwrap();
        assert_eq!(created.id, "b1");
        assert_eq!(
            created.links.unwrap().board_url,
            "https://ui.honeycomb.io/acme/board/b1"
        );

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        let body = body_json(&request);
        assert_eq!(body["style"], "visual");
        assert_eq!(body["queries"][0]["query_style"], "combo");
        assert!(body.get("links").is_none());
        assert!(body.get("id").is_none());
    }

    #[test]
    fn dot_ids_never_reach_the_network() {
        let transport = Arc::new(ScriptedTransport::new().always(Ok(json_response(204, ""))));
        let boards = Boards::new(executor(Arc::clone(&transport)));
        for id in ["..", ".", ""] {
            let err = boards.delete(&Context::background(), id).unwrap_err();
            assert!(matches!(err, ApiError::InvalidPath(_)), "{id:?}");
        }
        assert_eq!(transport.attempts(), 0);
    }

    #[test]
    fn update_puts_to_member_path() {
        let transport = Arc::new(ScriptedTransport::new().then(Ok(json_response(
            200,
            r#"{"id":"b1","name":"Renamed","queries":[]}"#,
        ))));
        let boards = Boards::new(executor(Arc::clone(&transport)));
        let board = Board {
            name: "Renamed".to_string(),
            ..Default::default()
        };
        let updated = boards.update(&Context::background(), "b1", &board).unwrap();
        assert_eq!(updated.name, "Renamed");
        let request = transport.last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.url, "http://localhost:3000/1/boards/b1");
    }
}
