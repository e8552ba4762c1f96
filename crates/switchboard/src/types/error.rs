//! Error Types
//!
//! JSON-RPC 2.0 error data and the standard error codes the transport
//! answers with.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// JSON-RPC error data.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{code}] {message}")]
pub struct ErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional error data (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorData {
    // JSON-RPC 2.0 standard error codes
    // https://www.jsonrpc.org/specification#error_object

    /// Parse error - Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;

    /// Invalid Request - The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i32 = -32600;

    /// Method not found - The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid params - Invalid method parameter(s).
    pub const INVALID_PARAMS: i32 = -32602;

    /// Internal error - Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;

    /// Create a new error with code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new error with additional data.
    pub fn with_data(code: i32, message: impl Into<String>, data: Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create a parse error.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(Self::PARSE_ERROR, message)
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_REQUEST, message)
    }

    /// Create a method not found error.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            Self::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    /// Create an invalid params error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }

    /// Create an internal error.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, message)
    }

    /// Create a tool not found error.
    pub fn tool_not_found(name: &str) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, format!("Tool not found: {}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorData::PARSE_ERROR, -32700);
        assert_eq!(ErrorData::INVALID_REQUEST, -32600);
        assert_eq!(ErrorData::METHOD_NOT_FOUND, -32601);
        assert_eq!(ErrorData::INVALID_PARAMS, -32602);
        assert_eq!(ErrorData::INTERNAL_ERROR, -32603);
    }

    #[test]
    fn test_error_display() {
        let error = ErrorData::invalid_params("limit out of range");
        assert_eq!(error.to_string(), "[-32602] limit out of range");
        let source: &dyn std::error::Error = &error;
        assert!(source.source().is_none());
    }

    #[test]
    fn test_error_serialization() {
        let error = ErrorData::tool_not_found("campaign_get");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], -32601);
        assert_eq!(json["message"], "Tool not found: campaign_get");
        assert!(json.get("data").is_none());
    }
}
