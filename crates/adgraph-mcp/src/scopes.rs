//! Scope manager.
//!
//! Scopes are named groups of generated tools an agent loads and unloads
//! at runtime to keep its visible tool list small. Object scopes come
//! straight from the generated catalog (one per spec file); curated
//! scopes are hand-picked task-oriented bundles over the same tools.
//!
//! Every operation leaves the registry equal to the union of the loaded
//! scopes plus the meta tools, and emits at most one list-changed
//! notification: mutations that change nothing stay silent.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use fbgraph::GraphClient;
use serde::Serialize;
use switchboard::ToolRegistry;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::generated;
use crate::tools::{into_registry_handler, tool_definition, GeneratedTool};

/// Where a scope's tool list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// All tools of one generated object module.
    Object,
    /// A hand-picked cross-object bundle.
    Curated,
}

/// A scope definition in the catalog.
pub struct ScopeDef {
    pub name: String,
    pub description: String,
    pub kind: ScopeKind,
    pub tool_names: Vec<&'static str>,
}

/// One row of the scope catalog as rendered to agents.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeStatus {
    pub name: String,
    pub description: String,
    pub kind: ScopeKind,
    pub loaded: bool,
    pub tool_count: usize,
}

/// Net effect of one scope mutation.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeChange {
    pub tools_added: usize,
    pub tools_removed: usize,
    /// Loaded scope names after the mutation, sorted.
    pub loaded: Vec<String>,
}

impl ScopeChange {
    pub fn changed(&self) -> bool {
        self.tools_added > 0 || self.tools_removed > 0
    }
}

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("unknown scope '{name}'; valid scopes: {valid}")]
    Unknown { name: String, valid: String },
}

struct ScopeState {
    enabled: BTreeSet<String>,
    /// Generated tool names currently registered by this manager.
    active: BTreeSet<&'static str>,
}

/// Owns the scope catalog and drives registry membership from it.
pub struct ScopeManager {
    registry: Arc<ToolRegistry>,
    client: Arc<GraphClient>,
    catalog: BTreeMap<String, ScopeDef>,
    tools_by_name: BTreeMap<&'static str, GeneratedTool>,
    state: RwLock<ScopeState>,
}

impl ScopeManager {
    pub fn new(registry: Arc<ToolRegistry>, client: Arc<GraphClient>) -> Self {
        let mut tools_by_name = BTreeMap::new();
        let mut catalog = BTreeMap::new();

        for scope in generated::object_scopes() {
            for tool in &scope.tools {
                tools_by_name.insert(tool.name, *tool);
            }
            catalog.insert(
                scope.name.to_string(),
                ScopeDef {
                    name: scope.name.to_string(),
                    description: format!(
                        "All {} generated {} tools",
                        scope.tool_names.len(),
                        scope.name
                    ),
                    kind: ScopeKind::Object,
                    tool_names: scope.tool_names.to_vec(),
                },
            );
        }

        for (name, description, tool_names) in curated_scopes() {
            catalog.insert(
                name.to_string(),
                ScopeDef {
                    name: name.to_string(),
                    description: description.to_string(),
                    kind: ScopeKind::Curated,
                    tool_names,
                },
            );
        }

        Self {
            registry,
            client,
            catalog,
            tools_by_name,
            state: RwLock::new(ScopeState {
                enabled: BTreeSet::new(),
                active: BTreeSet::new(),
            }),
        }
    }

    /// All scope names, sorted.
    pub fn scope_names(&self) -> Vec<String> {
        self.catalog.keys().cloned().collect()
    }

    /// Direct catalog access for rendering.
    pub fn scope_defs(&self) -> impl Iterator<Item = &ScopeDef> {
        self.catalog.values()
    }

    /// Currently loaded scope names, sorted.
    pub async fn loaded(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.enabled.iter().cloned().collect()
    }

    /// Full catalog with loaded markers.
    pub async fn statuses(&self) -> Vec<ScopeStatus> {
        let state = self.state.read().await;
        self.catalog
            .values()
            .map(|def| ScopeStatus {
                name: def.name.clone(),
                description: def.description.clone(),
                kind: def.kind,
                loaded: state.enabled.contains(&def.name),
                tool_count: def.tool_names.len(),
            })
            .collect()
    }

    /// Replace the loaded scope set.
    pub async fn set(&self, names: &[String]) -> Result<ScopeChange, ScopeError> {
        self.validate(names)?;
        let mut state = self.state.write().await;
        state.enabled = names.iter().cloned().collect();
        Ok(self.apply(&mut state))
    }

    /// Load additional scopes.
    pub async fn add(&self, names: &[String]) -> Result<ScopeChange, ScopeError> {
        self.validate(names)?;
        let mut state = self.state.write().await;
        state.enabled.extend(names.iter().cloned());
        Ok(self.apply(&mut state))
    }

    /// Unload scopes. Tools shared with a still-loaded scope stay.
    pub async fn remove(&self, names: &[String]) -> Result<ScopeChange, ScopeError> {
        self.validate(names)?;
        let mut state = self.state.write().await;
        for name in names {
            state.enabled.remove(name);
        }
        Ok(self.apply(&mut state))
    }

    fn validate(&self, names: &[String]) -> Result<(), ScopeError> {
        for name in names {
            if !self.catalog.contains_key(name) {
                return Err(ScopeError::Unknown {
                    name: name.clone(),
                    valid: self.scope_names().join(", "),
                });
            }
        }
        Ok(())
    }

    /// Reconcile the registry against the enabled set and notify once if
    /// membership changed.
    fn apply(&self, state: &mut ScopeState) -> ScopeChange {
        let mut target: BTreeSet<&'static str> = BTreeSet::new();
        for scope in &state.enabled {
            if let Some(def) = self.catalog.get(scope) {
                target.extend(def.tool_names.iter().copied());
            }
        }

        let removed: Vec<&'static str> =
            state.active.difference(&target).copied().collect();
        let added: Vec<&'static str> =
            target.difference(&state.active).copied().collect();

        if !removed.is_empty() {
            self.registry.unregister(removed.iter().copied());
        }
        for name in &added {
            match self.tools_by_name.get(name) {
                Some(tool) => {
                    self.registry.register(
                        tool_definition(tool),
                        into_registry_handler(Arc::clone(&self.client), tool.handler),
                    );
                }
                None => warn!(tool = name, "scope references a tool missing from the catalog"),
            }
        }

        state.active = target;
        let change = ScopeChange {
            tools_added: added.len(),
            tools_removed: removed.len(),
            loaded: state.enabled.iter().cloned().collect(),
        };
        if change.changed() {
            debug!(
                added = change.tools_added,
                removed = change.tools_removed,
                "scope membership changed"
            );
            self.registry.notify_list_changed();
        }
        change
    }
}

/// Hand-picked cross-object scopes. Tool names here must exist in the
/// generated catalog; `tests/catalog.rs` enforces that.
fn curated_scopes() -> Vec<(&'static str, &'static str, Vec<&'static str>)> {
    vec![
        (
            "essentials",
            "Account overview and read access to campaigns, ad sets, and ads",
            vec![
                "user_get",
                "user_list_adaccounts",
                "ad_account_get",
                "ad_account_list_campaigns",
                "ad_account_list_adsets",
                "ad_account_list_ads",
                "campaign_get",
                "ad_set_get",
                "ad_get",
            ],
        ),
        (
            "campaign_management",
            "Create, update, copy, and delete campaigns",
            vec![
                "ad_account_create_campaign",
                "ad_account_list_campaigns",
                "campaign_get",
                "campaign_update",
                "campaign_delete",
                "campaign_create_copie",
                "campaign_list_adsets",
                "campaign_list_ads",
            ],
        ),
        (
            "reporting",
            "Insights and performance reporting at every level",
            vec![
                "ad_account_list_insights",
                "campaign_list_insights",
                "ad_set_list_insights",
                "ad_list_insights",
                "ad_account_list_campaigns",
                "ad_account_list_adsets",
                "ad_account_list_ads",
            ],
        ),
        (
            "audience",
            "Custom audience management and membership updates",
            vec![
                "ad_account_create_customaudience",
                "ad_account_list_customaudiences",
                "custom_audience_get",
                "custom_audience_update",
                "custom_audience_delete",
                "custom_audience_create_user",
                "custom_audience_delete_users",
                "custom_audience_list_ads",
                "custom_audience_list_sessions",
            ],
        ),
        (
            "creative",
            "Ad creative management and previews",
            vec![
                "ad_account_create_adcreative",
                "ad_account_list_adcreatives",
                "ad_creative_get",
                "ad_creative_update",
                "ad_creative_delete",
                "ad_creative_list_previews",
                "ad_list_previews",
                "ad_list_adcreatives",
            ],
        ),
        (
            "optimization",
            "Ad set and ad tuning: budgets, bids, statuses",
            vec![
                "ad_set_get",
                "ad_set_update",
                "ad_set_create_copie",
                "ad_set_list_ads",
                "ad_set_list_insights",
                "ad_update",
                "campaign_update",
            ],
        ),
        (
            "video",
            "Ad video listings; uploads go through the always-on meta tools",
            vec!["ad_account_list_advideos"],
        ),
    ]
}
