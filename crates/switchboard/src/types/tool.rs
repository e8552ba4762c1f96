//! Tool Types
//!
//! Tool definitions, call parameters, and call results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::content::Content;

/// A tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Programmatic name of the tool.
    pub name: String,

    /// Description for the LLM.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for input parameters.
    pub input_schema: ToolSchema,
}

impl Tool {
    /// Create a new tool with name and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema: ToolSchema::empty(),
        }
    }

    /// Set the input schema.
    pub fn with_input_schema(mut self, schema: ToolSchema) -> Self {
        self.input_schema = schema;
        self
    }

    /// Set the input schema from a JSON value.
    pub fn with_input_schema_value(mut self, schema: Value) -> Self {
        self.input_schema = ToolSchema::from_value(schema);
        self
    }
}

/// JSON Schema for tool input.
///
/// Kept as a thin wrapper over the JSON document: the catalog is
/// generated, so the server never introspects schemas beyond the
/// top-level shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Always "object" for tool schemas.
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Property definitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,

    /// Required property names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    /// Whether properties outside `properties` are accepted.
    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Value>,
}

impl ToolSchema {
    /// Create an empty schema (no parameters).
    pub fn empty() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: None,
            required: None,
            additional_properties: None,
        }
    }

    /// Create a schema from a JSON value.
    pub fn from_value(value: Value) -> Self {
        if let Value::Object(map) = value {
            Self {
                schema_type: map
                    .get("type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("object")
                    .to_string(),
                properties: map.get("properties").and_then(|v| {
                    if let Value::Object(props) = v {
                        Some(props.clone())
                    } else {
                        None
                    }
                }),
                required: map.get("required").and_then(|v| {
                    if let Value::Array(arr) = v {
                        Some(
                            arr.iter()
                                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                                .collect(),
                        )
                    } else {
                        None
                    }
                }),
                additional_properties: map.get("additionalProperties").cloned(),
            }
        } else {
            Self::empty()
        }
    }
}

impl Default for ToolSchema {
    fn default() -> Self {
        Self::empty()
    }
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Name of the tool to call.
    pub name: String,

    /// Arguments to pass to the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content blocks representing the result.
    pub content: Vec<Content>,

    /// Whether the tool call resulted in an error.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,

    /// Structured content accompanying the text (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl CallToolResult {
    /// Create a successful result with content.
    pub fn success(content: Vec<Content>) -> Self {
        Self {
            content,
            is_error: false,
            structured_content: None,
        }
    }

    /// Create a successful result with a single text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self::success(vec![Content::text(text)])
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
            structured_content: None,
        }
    }

    /// Add structured content.
    pub fn with_structured(mut self, value: Value) -> Self {
        self.structured_content = Some(value);
        self
    }
}

/// Result of tools/list request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}
