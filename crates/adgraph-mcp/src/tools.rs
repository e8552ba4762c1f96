//! Runtime support for the generated catalog.
//!
//! The emitter in `graphgen` targets exactly this module: generated
//! handlers bind their arguments with [`bind_args`], hand bodies back via
//! [`raw_response`], and are collected into [`GeneratedTool`] tables. The
//! scope manager turns those tables into registry registrations.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use fbgraph::{GraphClient, GraphError};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use switchboard::{CallToolResult, Tool, ToolHandler};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Result type every generated handler returns.
pub type HandlerResult = Result<CallToolResult, ToolError>;

/// A generated handler: gateway client and raw arguments in, result out.
pub type GeneratedHandler =
    fn(Arc<GraphClient>, Value, CancellationToken) -> Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// One generated tool: everything needed to register and dispatch it.
#[derive(Clone, Copy)]
pub struct GeneratedTool {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: fn() -> Value,
    pub handler: GeneratedHandler,
}

/// One generated object scope: the module-level tables stitched together.
pub struct ObjectScope {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub tool_names: &'static [&'static str],
    pub tools: Vec<GeneratedTool>,
}

/// Failures surfaced by tool handlers. These become error-flagged tool
/// results, never JSON-RPC transport faults.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments did not match the tool's schema; no request was sent.
    #[error("invalid arguments: {0}")]
    Binding(String),

    /// The gateway reported a vendor or transport failure.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Deserialize tool-call arguments into a generated argument struct.
pub fn bind_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::Binding(e.to_string()))
}

/// Wrap a raw vendor response body as a successful tool result. Bodies
/// pass through unreshaped.
pub fn raw_response(body: &[u8]) -> CallToolResult {
    CallToolResult::text(String::from_utf8_lossy(body).into_owned())
}

/// Render a flattened extra argument as a query-string value. Strings go
/// through verbatim; everything else is JSON-encoded.
pub fn render_extra(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert a handler outcome into the tool result surfaced to the agent.
/// Vendor errors keep their structured fields alongside the one-line
/// summary.
pub fn to_tool_result(outcome: HandlerResult) -> CallToolResult {
    match outcome {
        Ok(result) => result,
        Err(ToolError::Graph(GraphError::Api(api))) => CallToolResult::error(api.summary())
            .with_structured(json!({ "error": api })),
        Err(other) => CallToolResult::error(other.to_string()),
    }
}

/// Adapt a generated handler into a registry [`ToolHandler`], binding the
/// gateway client in.
pub fn into_registry_handler(client: Arc<GraphClient>, handler: GeneratedHandler) -> ToolHandler {
    Arc::new(move |args, cancel| {
        let fut = handler(Arc::clone(&client), args, cancel);
        Box::pin(async move { Ok(to_tool_result(fut.await)) })
    })
}

/// Registry-facing tool definition for a generated tool.
pub fn tool_definition(tool: &GeneratedTool) -> Tool {
    Tool::new(tool.name, tool.description).with_input_schema_value((tool.schema)())
}
