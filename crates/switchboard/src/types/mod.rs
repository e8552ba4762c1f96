//! Protocol Types
//!
//! Wire types for the tool-facing subset of MCP 2025-06-18.

pub mod content;
pub mod error;
pub mod jsonrpc;
pub mod tool;
