//! Mock vendor server for server-level tests.
//!
//! Echoes back enough of each request (query string, JSON body, path
//! parameters) for the tests to assert the exact wire shape the
//! generated handlers produce.

use std::collections::HashMap;
use std::sync::Arc;

use adgraph_mcp::scopes::ScopeManager;
use axum::extract::{Path, RawQuery};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::{Form, Router};
use fbgraph::GraphClient;
use serde_json::{json, Value};
use switchboard::ToolRegistry;

pub struct MockVendor {
    pub base: String,
}

pub async fn spawn_mock() -> MockVendor {
    let app = Router::new()
        .route("/v23.0/{id}/ads", get(list_ads))
        .route("/v23.0/{id}/businesses", post(create_business))
        .route("/v23.0", post(batch));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockVendor {
        base: format!("http://{}", addr),
    }
}

/// Registry + scope manager + meta tools wired to the mock vendor.
pub async fn setup() -> (MockVendor, Arc<ToolRegistry>, Arc<ScopeManager>) {
    let mock = spawn_mock().await;
    let client = Arc::new(GraphClient::new("test-token").with_host(mock.base.clone()));
    let registry = Arc::new(ToolRegistry::new());
    let manager = Arc::new(ScopeManager::new(Arc::clone(&registry), Arc::clone(&client)));
    adgraph_mcp::meta::register_all(&registry, &manager, &client);
    (mock, registry, manager)
}

async fn list_ads(Path(id): Path<String>, RawQuery(query): RawQuery) -> Json<Value> {
    Json(json!({
        "path_id": id,
        "received_query": query.unwrap_or_default(),
        "data": [{"id": "120210000001", "name": "Ad one"}],
    }))
}

async fn create_business(Path(id): Path<String>, Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "id": "8800001",
        "path_id": id,
        "received_body": body,
    }))
}

async fn batch(Form(form): Form<HashMap<String, String>>) -> Result<Json<Value>, StatusCode> {
    let Some(batch) = form.get("batch") else {
        return Err(StatusCode::BAD_REQUEST);
    };
    if !form.contains_key("access_token") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let items: Vec<Value> = serde_json::from_str(batch).map_err(|_| StatusCode::BAD_REQUEST)?;
    let responses: Vec<Value> = items
        .iter()
        .map(|item| {
            let url = item["relative_url"].as_str().unwrap_or_default();
            if url.contains("invalid") {
                json!({
                    "code": 400,
                    "headers": [{"name": "Content-Type", "value": "application/json"}],
                    "body": r#"{"error":{"message":"Invalid object ID"}}"#,
                })
            } else {
                json!({
                    "code": 200,
                    "headers": [{"name": "Content-Type", "value": "application/json"}],
                    "body": format!(r#"{{"echo":"{}"}}"#, url),
                })
            }
        })
        .collect();
    Ok(Json(Value::Array(responses)))
}
