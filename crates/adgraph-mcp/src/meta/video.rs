//! Video upload meta tools.
//!
//! `facebook_video_upload` runs one resumable session,
//! `facebook_video_status` checks encoding state, and
//! `facebook_video_upload_batch` uploads several files sequentially and
//! reports per-file outcomes. All three share one [`VideoUploader`] so
//! concurrent sessions fail fast instead of interleaving chunks.

use std::path::Path;
use std::sync::Arc;

use fbgraph::{GraphClient, UploadOptions, VideoUploader};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use switchboard::{CallToolResult, Tool, ToolRegistry};

use super::schema_value;
use crate::tools::{raw_response, to_tool_result};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct VideoUploadArgs {
    /// Ad account id, with or without the `act_` prefix.
    account_id: String,
    /// Absolute path to the video file on the server host.
    file_path: String,
    /// Poll until the video finishes encoding before returning.
    #[serde(default)]
    wait_for_encoding: bool,
    /// Encoding poll interval in seconds (1-30, default 3).
    #[serde(default)]
    polling_interval_s: Option<u64>,
    /// Encoding poll deadline in seconds (30-600, default 180).
    #[serde(default)]
    timeout_s: Option<u64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct VideoStatusArgs {
    /// Numeric video id returned by an upload.
    video_id: String,
    /// Fields to request; defaults to `status`.
    #[serde(default)]
    fields: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct VideoUploadBatchArgs {
    /// Ad account id, with or without the `act_` prefix.
    account_id: String,
    /// Files to upload, in order. Failures do not stop later files.
    file_paths: Vec<String>,
    /// Poll each video until encoding finishes before moving on.
    #[serde(default)]
    wait_for_encoding: bool,
}

/// Graph video endpoints want the `act_` form of the account node.
fn account_node(account_id: &str) -> String {
    if account_id.starts_with("act_") {
        account_id.to_string()
    } else {
        format!("act_{}", account_id)
    }
}

pub fn register(registry: &Arc<ToolRegistry>, client: &Arc<GraphClient>) {
    let uploader = Arc::new(VideoUploader::new(Arc::clone(client)));

    let tool = Tool::new(
        "facebook_video_upload",
        "Upload a video file to an ad account with the chunked resumable \
         protocol. Optionally waits until encoding finishes. Returns the \
         new video id.",
    )
    .with_input_schema_value(schema_value::<VideoUploadArgs>());
    let up = Arc::clone(&uploader);
    registry.register_meta(
        tool,
        Arc::new(move |args, cancel| {
            let up = Arc::clone(&up);
            Box::pin(async move {
                let args: VideoUploadArgs = match serde_json::from_value(args) {
                    Ok(args) => args,
                    Err(e) => {
                        return Ok(CallToolResult::error(format!("invalid arguments: {}", e)))
                    }
                };
                let options = UploadOptions::from_seconds(
                    args.wait_for_encoding,
                    args.polling_interval_s,
                    args.timeout_s,
                );
                let node = account_node(&args.account_id);
                match up
                    .upload(&node, Path::new(&args.file_path), &options, &cancel)
                    .await
                {
                    Ok(outcome) => {
                        let payload = json!(outcome);
                        Ok(CallToolResult::text(format!(
                            "Uploaded '{}' ({} bytes) as video {}{}",
                            outcome.title,
                            outcome.file_size,
                            outcome.video_id,
                            if outcome.encoding_ready {
                                "; encoding finished"
                            } else {
                                ""
                            }
                        ))
                        .with_structured(payload))
                    }
                    Err(e) => Ok(to_tool_result(Err(e.into()))),
                }
            })
        }),
    );

    let tool = Tool::new(
        "facebook_video_status",
        "Fetch the encoding status (or other fields) of an uploaded video.",
    )
    .with_input_schema_value(schema_value::<VideoStatusArgs>());
    let cl = Arc::clone(client);
    registry.register_meta(
        tool,
        Arc::new(move |args, cancel| {
            let cl = Arc::clone(&cl);
            Box::pin(async move {
                let args: VideoStatusArgs = match serde_json::from_value(args) {
                    Ok(args) => args,
                    Err(e) => {
                        return Ok(CallToolResult::error(format!("invalid arguments: {}", e)))
                    }
                };
                let fields = if args.fields.is_empty() {
                    "status".to_string()
                } else {
                    args.fields.join(",")
                };
                let query = vec![("fields".to_string(), fields)];
                let result = cl
                    .get(&format!("/{}", args.video_id), &query, &cancel)
                    .await;
                Ok(to_tool_result(
                    result.map(|body| raw_response(&body)).map_err(Into::into),
                ))
            })
        }),
    );

    let tool = Tool::new(
        "facebook_video_upload_batch",
        "Upload multiple video files to an ad account, one after another. \
         A failed file is reported and the rest still upload.",
    )
    .with_input_schema_value(schema_value::<VideoUploadBatchArgs>());
    let up = Arc::clone(&uploader);
    registry.register_meta(
        tool,
        Arc::new(move |args, cancel| {
            let up = Arc::clone(&up);
            Box::pin(async move {
                let args: VideoUploadBatchArgs = match serde_json::from_value(args) {
                    Ok(args) => args,
                    Err(e) => {
                        return Ok(CallToolResult::error(format!("invalid arguments: {}", e)))
                    }
                };
                if args.file_paths.is_empty() {
                    return Ok(CallToolResult::error("file_paths must not be empty"));
                }
                let options = UploadOptions::from_seconds(args.wait_for_encoding, None, None);
                let node = account_node(&args.account_id);

                let mut results = Vec::with_capacity(args.file_paths.len());
                let mut successful = 0usize;
                for file_path in &args.file_paths {
                    match up
                        .upload(&node, Path::new(file_path), &options, &cancel)
                        .await
                    {
                        Ok(outcome) => {
                            successful += 1;
                            results.push(json!({
                                "file_path": file_path,
                                "success": true,
                                "outcome": outcome,
                            }));
                        }
                        Err(e) => {
                            results.push(json!({
                                "file_path": file_path,
                                "success": false,
                                "error": e.to_string(),
                            }));
                        }
                    }
                }

                let total = args.file_paths.len();
                let payload = json!({
                    "results": results,
                    "summary": {
                        "total": total,
                        "successful": successful,
                        "failed": total - successful,
                    },
                });
                let text = serde_json::to_string_pretty(&payload)
                    .unwrap_or_else(|_| payload.to_string());
                Ok(CallToolResult::text(text).with_structured(payload))
            })
        }),
    );
}
