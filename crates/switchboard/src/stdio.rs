//! Stdio Transport
//!
//! Line-delimited JSON-RPC 2.0 over stdin/stdout: one message per line,
//! responses and notifications interleaved on stdout. Tool calls are
//! spawned so slow vendor requests never block the read loop; every call
//! gets a child cancellation token that fires when stdin closes.
//!
//! Logging must go to stderr - stdout belongs to the protocol.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::registry::ToolRegistry;
use crate::types::error::ErrorData;
use crate::types::jsonrpc::{JsonRpcErrorResponse, JsonRpcMessage, JsonRpcResponse, RequestId};
use crate::types::tool::{CallToolParams, ListToolsResult};

/// MCP protocol revision this transport speaks.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Serve the registry over process stdin/stdout until stdin closes.
pub async fn serve(
    registry: Arc<ToolRegistry>,
    server_name: &str,
    server_version: &str,
) -> std::io::Result<()> {
    serve_io(
        registry,
        server_name,
        server_version,
        tokio::io::stdin(),
        tokio::io::stdout(),
    )
    .await
}

/// Serve over arbitrary byte streams (tests drive this with duplex pipes).
pub async fn serve_io<R, W>(
    registry: Arc<ToolRegistry>,
    server_name: &str,
    server_version: &str,
    reader: R,
    writer: W,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(write_loop(writer, out_rx));

    let shutdown = CancellationToken::new();

    // Forward registry membership changes as notifications.
    let notify_tx = out_tx.clone();
    let mut changes = registry.changes();
    let notify_shutdown = shutdown.clone();
    let notifier = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = notify_shutdown.cancelled() => break,
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let note = JsonRpcMessage::notification(
                        "notifications/tools/list_changed",
                        json!({}),
                    );
                    if send_json(&notify_tx, &note).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let server_name = server_name.to_string();
    let server_version = server_version.to_string();
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let msg: JsonRpcMessage = match serde_json::from_str(&line) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unparseable message");
                let _ = out_tx.send(
                    json!({
                        "jsonrpc": "2.0",
                        "id": null,
                        "error": ErrorData::parse_error(e.to_string()),
                    })
                    .to_string(),
                );
                continue;
            }
        };
        handle_message(
            &registry,
            &server_name,
            &server_version,
            msg,
            &out_tx,
            &shutdown,
        );
    }

    // stdin closed: cancel in-flight calls and drain the writer.
    shutdown.cancel();
    notifier.abort();
    drop(out_tx);
    let _ = writer_task.await;
    Ok(())
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        if writer.write_all(line.as_bytes()).await.is_err() {
            break;
        }
        if writer.write_all(b"\n").await.is_err() {
            break;
        }
        if writer.flush().await.is_err() {
            break;
        }
    }
}

fn send_json<T: serde::Serialize>(
    tx: &mpsc::UnboundedSender<String>,
    value: &T,
) -> Result<(), ()> {
    match serde_json::to_string(value) {
        Ok(line) => tx.send(line).map_err(|_| ()),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize outgoing message");
            Err(())
        }
    }
}

fn handle_message(
    registry: &Arc<ToolRegistry>,
    server_name: &str,
    server_version: &str,
    msg: JsonRpcMessage,
    out_tx: &mpsc::UnboundedSender<String>,
    shutdown: &CancellationToken,
) {
    let Some(id) = msg.id.clone() else {
        // Notification from the client; nothing expects a reply.
        match msg.method.as_str() {
            "notifications/initialized" | "notifications/cancelled" => {}
            other => tracing::debug!(method = other, "Ignoring unknown notification"),
        }
        return;
    };

    match msg.method.as_str() {
        "initialize" => {
            let result = json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": true } },
                "serverInfo": { "name": server_name, "version": server_version },
            });
            let _ = send_json(out_tx, &JsonRpcResponse::success(id, result));
        }
        "ping" => {
            let _ = send_json(out_tx, &JsonRpcResponse::success(id, json!({})));
        }
        "tools/list" => {
            let result = ListToolsResult {
                tools: registry.list(),
            };
            let _ = send_json(out_tx, &JsonRpcResponse::success(id, result));
        }
        "tools/call" => {
            let params: CallToolParams =
                match serde_json::from_value(msg.params.unwrap_or(Value::Null)) {
                    Ok(params) => params,
                    Err(e) => {
                        let error =
                            ErrorData::invalid_params(format!("Invalid tools/call params: {}", e));
                        let _ = send_json(out_tx, &JsonRpcErrorResponse::new(id, error));
                        return;
                    }
                };
            spawn_call(registry, params, id, out_tx, shutdown);
        }
        other => {
            let _ = send_json(
                out_tx,
                &JsonRpcErrorResponse::new(id, ErrorData::method_not_found(other)),
            );
        }
    }
}

fn spawn_call(
    registry: &Arc<ToolRegistry>,
    params: CallToolParams,
    id: RequestId,
    out_tx: &mpsc::UnboundedSender<String>,
    shutdown: &CancellationToken,
) {
    let registry = Arc::clone(registry);
    let out_tx = out_tx.clone();
    let cancel = shutdown.child_token();
    tokio::spawn(async move {
        let arguments = params
            .arguments
            .map(Value::Object)
            .unwrap_or_else(|| json!({}));
        match registry.call(&params.name, arguments, cancel).await {
            Ok(result) => {
                let _ = send_json(&out_tx, &JsonRpcResponse::success(id, result));
            }
            Err(error) => {
                let _ = send_json(&out_tx, &JsonRpcErrorResponse::new(id, error));
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tool::{CallToolResult, Tool};
    use tokio::io::AsyncBufReadExt;

    fn test_registry() -> Arc<ToolRegistry> {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(
            Tool::new("echo", "Echo the arguments back"),
            Arc::new(|args, _cancel| {
                Box::pin(async move { Ok(CallToolResult::text(args.to_string())) })
            }),
        );
        registry
    }

    async fn run_session(input: &str) -> Vec<Value> {
        let registry = test_registry();
        let (client_w, server_r) = tokio::io::duplex(64 * 1024);
        let (server_w, client_r) = tokio::io::duplex(64 * 1024);

        let server = tokio::spawn(async move {
            serve_io(registry, "test-server", "0.0.0", server_r, server_w)
                .await
                .unwrap();
        });

        let mut client_w = client_w;
        client_w.write_all(input.as_bytes()).await.unwrap();
        drop(client_w);
        server.await.unwrap();

        let mut out = Vec::new();
        let mut lines = BufReader::new(client_r).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            out.push(serde_json::from_str(&line).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_initialize_and_list() {
        let responses = run_session(concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        ))
        .await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(
            responses[0]["result"]["capabilities"]["tools"]["listChanged"],
            true
        );
        assert_eq!(responses[1]["result"]["tools"][0]["name"], "echo");
    }

    #[tokio::test]
    async fn test_call_tool_roundtrip() {
        let responses = run_session(concat!(
            r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"echo","arguments":{"a":1}}}"#,
            "\n",
        ))
        .await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 9);
        assert_eq!(
            responses[0]["result"]["content"][0]["text"],
            r#"{"a":1}"#
        );
    }

    #[tokio::test]
    async fn test_unknown_method_and_parse_error() {
        let responses = run_session(concat!(
            "this is not json\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#,
            "\n",
        ))
        .await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], ErrorData::PARSE_ERROR);
        assert_eq!(responses[1]["error"]["code"], ErrorData::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_call_unknown_tool_is_error_response() {
        let responses = run_session(concat!(
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"nope"}}"#,
            "\n",
        ))
        .await;
        assert_eq!(responses[0]["error"]["code"], ErrorData::METHOD_NOT_FOUND);
    }
}
