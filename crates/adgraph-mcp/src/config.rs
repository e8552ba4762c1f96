//! Environment configuration.
//!
//! The access token itself is read by [`fbgraph::GraphClient::from_env`];
//! this module covers the remaining knobs.

/// Comma-separated scope names loaded at startup.
pub const ENABLED_CATEGORIES_ENV: &str = "ENABLED_CATEGORIES";

/// Scope set used when `ENABLED_CATEGORIES` is absent or empty.
pub const DEFAULT_SCOPES: &str = "essentials";

/// Server name advertised during `initialize`.
pub const SERVER_NAME: &str = "adgraph-mcp";

/// Parse the initial scope list from the environment.
pub fn initial_scopes() -> Vec<String> {
    let raw = std::env::var(ENABLED_CATEGORIES_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SCOPES.to_string());
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
