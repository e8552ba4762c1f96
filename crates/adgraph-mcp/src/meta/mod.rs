//! Meta tools.
//!
//! Always-on tools that exist regardless of which scopes are loaded:
//! scope management, batch execution, and the video upload pipeline.
//! They register as meta so `reset` and scope mutations never remove
//! them. Argument structs derive `schemars::JsonSchema`; generated
//! endpoint tools synthesize their schemas instead.

mod batch;
mod manager;
mod video;

use std::sync::Arc;

use fbgraph::GraphClient;
use schemars::JsonSchema;
use serde_json::{json, Value};
use switchboard::ToolRegistry;

use crate::scopes::ScopeManager;

/// Names of every meta tool, for registry assertions.
pub const META_TOOL_NAMES: &[&str] = &[
    "tool_manager",
    "scope_selector",
    "facebook_batch",
    "facebook_video_upload",
    "facebook_video_status",
    "facebook_video_upload_batch",
];

/// Register all meta tools.
pub fn register_all(
    registry: &Arc<ToolRegistry>,
    manager: &Arc<ScopeManager>,
    client: &Arc<GraphClient>,
) {
    manager::register(registry, manager);
    batch::register(registry, client);
    video::register(registry, client);
}

/// Inline draft-07 schema for a meta-tool argument struct.
fn schema_value<T: JsonSchema>() -> Value {
    let mut settings = schemars::gen::SchemaSettings::draft07();
    settings.inline_subschemas = true;
    let schema = settings.into_generator().into_root_schema_for::<T>();
    serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Sample {
        name: String,
        #[serde(default)]
        count: Option<u64>,
    }

    #[test]
    fn test_schema_value_is_inline_draft07() {
        let schema = schema_value::<Sample>();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["name"].is_object());
        assert!(schema
            .get("definitions")
            .and_then(|d| d.as_object())
            .map_or(true, |m| m.is_empty()));
    }
}
