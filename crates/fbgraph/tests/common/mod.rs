//! Mock vendor server for integration tests.
//!
//! Serves just enough of the Graph API surface on 127.0.0.1: the ads
//! listing used by the gateway tests, the batch endpoint, and the full
//! video upload state machine with injectable offset-desync failures.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde_json::{json, Value};

pub type SharedState = Arc<Mutex<VendorState>>;

#[derive(Default)]
pub struct VendorState {
    /// Server-side chunk size handed out by the start phase.
    pub chunk: u64,
    /// Declared file size from the start phase.
    pub file_size: u64,
    /// Server-side truth for the next expected offset.
    pub server_start: u64,
    /// Number of transfer POSTs received.
    pub transfer_posts: usize,
    /// When true, the next transfer answers with subcode 1363037 once.
    pub desync_armed: bool,
    /// Bytes received across all chunks, in order.
    pub received: Vec<u8>,
    /// Statuses handed out by the encoding poll, front first.
    pub video_statuses: Vec<String>,
    /// Artificial delay on transfer posts (for exclusivity tests).
    pub transfer_delay: Option<Duration>,
    /// Whether the finish phase was reached.
    pub finished: bool,
}

pub struct MockVendor {
    pub base: String,
    pub state: SharedState,
}

pub async fn spawn_mock() -> MockVendor {
    let state: SharedState = Arc::new(Mutex::new(VendorState::default()));
    let app = Router::new()
        .route("/v23.0/act_123456789/ads", get(list_ads))
        .route("/v23.0/error400", get(error400))
        .route("/v23.0", post(batch))
        .route("/v23.0/{account}/advideos", post(advideos_phase))
        .route("/video/v23.0/{account}/advideos", post(advideos_transfer))
        .route("/v23.0/{video_id}", get(video_status))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockVendor {
        base: format!("http://{}", addr),
        state,
    }
}

async fn list_ads(RawQuery(query): RawQuery) -> Json<Value> {
    Json(json!({
        "received_query": query.unwrap_or_default(),
        "data": [{"id": "120210000001", "name": "Ad one", "status": "ACTIVE"}],
        "paging": {"cursors": {"before": "b", "after": "a"}},
    }))
}

async fn error400() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": {
                "message": "Unsupported get request",
                "type": "GraphMethodException",
                "code": 100,
                "fbtrace_id": "Axxxx",
            }
        })),
    )
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
                    "body": r#"{"id":"act_123","name":"A"}"#,
                })
            }
        })
        .collect();
    Ok(Json(Value::Array(responses)))
}

async fn advideos_phase(
    State(state): State<SharedState>,
    Path(_account): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match form.get("upload_phase").map(String::as_str) {
        Some("start") => {
            let file_size: u64 = form
                .get("file_size")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            let mut s = state.lock().unwrap();
            s.file_size = file_size;
            s.server_start = 0;
            if s.chunk == 0 {
                s.chunk = file_size;
            }
            let end = s.chunk.min(file_size);
            Ok(Json(json!({
                "upload_session_id": "sess-1",
                "video_id": "90001",
                "start_offset": "0",
                "end_offset": end.to_string(),
            })))
        }
        Some("finish") => {
            let mut s = state.lock().unwrap();
            s.finished = true;
            assert_eq!(form.get("upload_session_id").map(String::as_str), Some("sess-1"));
            assert!(form.contains_key("title"));
            Ok(Json(json!({"success": true})))
        }
        other => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"message": format!("bad phase {:?}", other), "code": 100}})),
        )),
    }
}

async fn advideos_transfer(
    State(state): State<SharedState>,
    Path(_account): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut start_offset: Option<u64> = None;
    let mut session_id: Option<String> = None;
    let mut chunk_bytes: Vec<u8> = Vec::new();
    let mut saw_phase = false;
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name().unwrap_or_default() {
            "upload_phase" => {
                assert_eq!(field.text().await.unwrap(), "transfer");
                saw_phase = true;
            }
            "start_offset" => start_offset = field.text().await.unwrap().parse().ok(),
            "upload_session_id" => session_id = Some(field.text().await.unwrap()),
            "video_file_chunk" => chunk_bytes = field.bytes().await.unwrap().to_vec(),
            other => panic!("unexpected multipart field {}", other),
        }
    }
    assert!(saw_phase, "transfer post missing upload_phase");
    assert_eq!(session_id.as_deref(), Some("sess-1"));
    let start_offset = start_offset.expect("transfer post missing start_offset");

    let delay = state.lock().unwrap().transfer_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut s = state.lock().unwrap();
    s.transfer_posts += 1;

    let expected_end = (s.server_start + s.chunk).min(s.file_size);
    if s.desync_armed || start_offset != s.server_start {
        s.desync_armed = false;
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": {
                    "message": "There was a problem uploading your video file.",
                    "type": "OAuthException",
                    "code": 390,
                    "error_subcode": 1363037,
                    "error_data": {
                        "start_offset": s.server_start.to_string(),
                        "end_offset": expected_end.to_string(),
                    },
                }
            })),
        ));
    }

    assert_eq!(chunk_bytes.len() as u64, expected_end - s.server_start);
    s.received.extend_from_slice(&chunk_bytes);
    s.server_start = expected_end;
    let next_end = (s.server_start + s.chunk).min(s.file_size);
    Ok(Json(json!({
        "start_offset": s.server_start.to_string(),
        "end_offset": next_end.to_string(),
    })))
}

async fn video_status(
    State(state): State<SharedState>,
    Path(video_id): Path<String>,
) -> Json<Value> {
    let mut s = state.lock().unwrap();
    let status = if s.video_statuses.is_empty() {
        "ready".to_string()
    } else {
        s.video_statuses.remove(0)
    };
    Json(json!({
        "id": video_id,
        "status": {"video_status": status},
    }))
}
