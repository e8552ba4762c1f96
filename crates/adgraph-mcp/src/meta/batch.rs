//! `facebook_batch`: run 1-50 Graph API operations as one vendor call.

use std::sync::Arc;

use fbgraph::{execute_batch, BatchHeader, BatchItem, GraphClient, MAX_BATCH_SIZE};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use switchboard::{CallToolResult, Tool, ToolRegistry};

use super::schema_value;
use crate::tools::to_tool_result;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct FacebookBatchArgs {
    /// 1-50 operations executed positionally in one request.
    operations: Vec<Operation>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct Operation {
    /// HTTP method: GET, POST, or DELETE.
    method: String,
    /// URL relative to the versioned API root, e.g. `act_123/campaigns?fields=id,name`.
    relative_url: String,
    /// Form-encoded body for POST operations.
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    headers: Option<Vec<Header>>,
    /// Correlation name echoed back on the matching result.
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct Header {
    name: String,
    value: String,
}

pub fn register(registry: &Arc<ToolRegistry>, client: &Arc<GraphClient>) {
    let tool = Tool::new(
        "facebook_batch",
        format!(
            "Execute up to {} Graph API operations in a single request. \
             Results come back in operation order with per-item status \
             and a summary (total, successful, failed, success_rate).",
            MAX_BATCH_SIZE
        ),
    )
    .with_input_schema_value(schema_value::<FacebookBatchArgs>());

    let client = Arc::clone(client);
    registry.register_meta(
        tool,
        Arc::new(move |args, cancel| {
            let client = Arc::clone(&client);
            Box::pin(async move {
                let args: FacebookBatchArgs = match serde_json::from_value(args) {
                    Ok(args) => args,
                    Err(e) => {
                        return Ok(CallToolResult::error(format!("invalid arguments: {}", e)))
                    }
                };
                let items: Vec<BatchItem> = args
                    .operations
                    .into_iter()
                    .map(|op| BatchItem {
                        method: op.method,
                        relative_url: op.relative_url,
                        body: op.body,
                        headers: op.headers.map(|headers| {
                            headers
                                .into_iter()
                                .map(|h| BatchHeader {
                                    name: h.name,
                                    value: h.value,
                                })
                                .collect()
                        }),
                        name: op.name,
                    })
                    .collect();

                let results = match execute_batch(&client, &items, &cancel).await {
                    Ok(results) => results,
                    Err(e) => return Ok(to_tool_result(Err(e.into()))),
                };

                let total = results.len();
                let successful = results.iter().filter(|r| r.success).count();
                let failed = total - successful;
                let payload = json!({
                    "results": results,
                    "summary": {
                        "total": total,
                        "successful": successful,
                        "failed": failed,
                        "success_rate": successful as f64 / total as f64,
                    },
                });
                let text = serde_json::to_string_pretty(&payload)
                    .unwrap_or_else(|_| payload.to_string());
                Ok(CallToolResult::text(text).with_structured(payload))
            })
        }),
    );
}
