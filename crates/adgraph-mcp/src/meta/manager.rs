//! Scope management meta tools: `tool_manager` (coarse get/set) and
//! `scope_selector` (fine-grained get/set/add/remove).

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use switchboard::{CallToolResult, Tool, ToolRegistry};

use super::schema_value;
use crate::scopes::{ScopeChange, ScopeError, ScopeKind, ScopeManager};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct ToolManagerArgs {
    /// `get` renders the scope catalog; `set` replaces the loaded set.
    action: ManagerAction,
    /// Scope names to load when `action` is `set`.
    #[serde(default)]
    scopes: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
enum ManagerAction {
    Get,
    Set,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
struct ScopeSelectorArgs {
    action: SelectorAction,
    /// Scope names the action operates on (ignored for `get_scopes`).
    #[serde(default)]
    domains: Vec<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
enum SelectorAction {
    GetScopes,
    SetScopes,
    AddScopes,
    RemoveScopes,
}

pub fn register(registry: &Arc<ToolRegistry>, manager: &Arc<ScopeManager>) {
    let tool = Tool::new(
        "tool_manager",
        "Inspect or replace the loaded Facebook tool scopes. Use action \
         'get' to list all scopes with descriptions, 'set' to load a new \
         scope list (replacing the current one).",
    )
    .with_input_schema_value(schema_value::<ToolManagerArgs>());
    let mgr = Arc::clone(manager);
    registry.register_meta(
        tool,
        Arc::new(move |args, _cancel| {
            let mgr = Arc::clone(&mgr);
            Box::pin(async move {
                let args: ToolManagerArgs = match serde_json::from_value(args) {
                    Ok(args) => args,
                    Err(e) => {
                        return Ok(CallToolResult::error(format!("invalid arguments: {}", e)))
                    }
                };
                Ok(match args.action {
                    ManagerAction::Get => render_catalog(&mgr).await,
                    ManagerAction::Set => render_change(mgr.set(&args.scopes).await),
                })
            })
        }),
    );

    let tool = Tool::new(
        "scope_selector",
        "Fine-grained scope control: get_scopes lists what is loaded, \
         set_scopes replaces, add_scopes and remove_scopes adjust the \
         loaded set incrementally.",
    )
    .with_input_schema_value(schema_value::<ScopeSelectorArgs>());
    let mgr = Arc::clone(manager);
    registry.register_meta(
        tool,
        Arc::new(move |args, _cancel| {
            let mgr = Arc::clone(&mgr);
            Box::pin(async move {
                let args: ScopeSelectorArgs = match serde_json::from_value(args) {
                    Ok(args) => args,
                    Err(e) => {
                        return Ok(CallToolResult::error(format!("invalid arguments: {}", e)))
                    }
                };
                Ok(match args.action {
                    SelectorAction::GetScopes => {
                        let loaded = mgr.loaded().await;
                        CallToolResult::text(if loaded.is_empty() {
                            "No scopes loaded.".to_string()
                        } else {
                            format!("Loaded scopes: {}", loaded.join(", "))
                        })
                        .with_structured(json!({ "loaded": loaded }))
                    }
                    SelectorAction::SetScopes => render_change(mgr.set(&args.domains).await),
                    SelectorAction::AddScopes => render_change(mgr.add(&args.domains).await),
                    SelectorAction::RemoveScopes => {
                        render_change(mgr.remove(&args.domains).await)
                    }
                })
            })
        }),
    );
}

async fn render_catalog(manager: &ScopeManager) -> CallToolResult {
    let statuses = manager.statuses().await;
    let loaded = manager.loaded().await;

    let mut lines = Vec::with_capacity(statuses.len() + 3);
    lines.push(format!(
        "Loaded scopes: {}",
        if loaded.is_empty() {
            "(none)".to_string()
        } else {
            loaded.join(", ")
        }
    ));
    lines.push(String::new());
    lines.push("Available scopes:".to_string());
    for status in &statuses {
        let kind = match status.kind {
            ScopeKind::Object => "object",
            ScopeKind::Curated => "curated",
        };
        lines.push(format!(
            "  [{}] {} ({}, {} tools): {}",
            if status.loaded { "x" } else { " " },
            status.name,
            kind,
            status.tool_count,
            status.description
        ));
    }

    CallToolResult::text(lines.join("\n"))
        .with_structured(json!({ "loaded": loaded, "scopes": statuses }))
}

fn render_change(result: Result<ScopeChange, ScopeError>) -> CallToolResult {
    match result {
        Ok(change) => {
            let loaded = if change.loaded.is_empty() {
                "(none)".to_string()
            } else {
                change.loaded.join(", ")
            };
            CallToolResult::text(format!(
                "Loaded scopes: {}. {} tools added, {} tools removed.",
                loaded, change.tools_added, change.tools_removed
            ))
            .with_structured(json!(change))
        }
        Err(e) => CallToolResult::error(e.to_string()),
    }
}
