//! adgraph-mcp - Facebook Ads MCP server
//!
//! Exposes the Graph API Marketing surface as MCP tools over stdio. The
//! per-endpoint tools are generated at build time from `api_specs/` and
//! grouped into scopes an agent can load and unload at runtime; a fixed
//! set of meta tools (scope management, batch execution, video upload)
//! is always present.

pub mod config;
pub mod generated;
pub mod meta;
pub mod scopes;
pub mod tools;
