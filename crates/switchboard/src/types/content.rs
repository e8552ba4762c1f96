//! Content Types
//!
//! Content blocks carried in tool results. Tool servers only ever emit
//! text (vendor JSON is passed through as a string), so the other MCP
//! content kinds are not modeled.

use serde::{Deserialize, Serialize};

/// Content block in a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    /// Text content.
    Text { text: String },
}

impl Content {
    /// Create text content.
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    /// Borrow the text if this is a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text } => Some(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_serialization() {
        let content = Content::text("hello");
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn test_text_roundtrip() {
        let content = Content::text("{\"id\":\"123\"}");
        let json = serde_json::to_string(&content).unwrap();
        let back: Content = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_text(), Some("{\"id\":\"123\"}"));
    }
}
