//! switchboard - minimal MCP server kit
//!
//! Just enough of the MCP 2025-06-18 surface to expose a mutable tool
//! catalog to an agent over line-delimited JSON-RPC on stdio:
//!
//! - **Tools**: named, schema-described, invokable units
//! - **Registry**: live tool set with register/unregister/reset and
//!   `tools/list_changed` notifications
//! - **Transport**: one JSON-RPC message per line, stdin in / stdout out
//!
//! Resources, prompts, sampling, and sessions are out of scope; this
//! kit serves tool-only servers.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use switchboard::{CallToolResult, Tool, ToolRegistry};
//!
//! let registry = Arc::new(ToolRegistry::new());
//! registry.register(
//!     Tool::new("hello", "Say hello"),
//!     Arc::new(|_args, _cancel| Box::pin(async { Ok(CallToolResult::text("Hello!")) })),
//! );
//! switchboard::stdio::serve(registry, "my-server", "0.1.0").await?;
//! ```

pub mod registry;
pub mod stdio;
pub mod types;

// Re-export commonly used types at crate root
pub use registry::{ToolFuture, ToolHandler, ToolRegistry};
pub use types::content::Content;
pub use types::error::ErrorData;
pub use types::jsonrpc::{
    JsonRpcErrorResponse, JsonRpcMessage, JsonRpcResponse, JsonRpcVersion, RequestId,
};
pub use types::tool::{CallToolParams, CallToolResult, ListToolsResult, Tool, ToolSchema};
