//! Tool Registry
//!
//! The live, mutable tool catalog the transport serves. Registration is
//! idempotent (re-registering a name replaces the prior record), removal
//! is by name, and `reset` drops everything except tools registered as
//! meta.
//!
//! Mutations return whether membership actually changed; callers batch a
//! logical mutation (e.g. one scope-manager operation) and then call
//! [`ToolRegistry::notify_list_changed`] once, so clients see a single
//! `notifications/tools/list_changed` per visible change.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::types::error::ErrorData;
use crate::types::tool::{CallToolResult, Tool};

/// Boxed future returned by tool handlers.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<CallToolResult, ErrorData>> + Send>>;

/// A tool handler: arguments plus a cancellation token in, result out.
///
/// Handlers must be stateless with respect to the registry; they run
/// concurrently and must never take registry locks.
pub type ToolHandler = Arc<dyn Fn(Value, CancellationToken) -> ToolFuture + Send + Sync>;

struct RegisteredTool {
    tool: Tool,
    handler: ToolHandler,
    /// Meta tools survive `reset` and cannot be unregistered.
    meta: bool,
}

/// Concurrent name -> tool map with a list-changed notification channel.
pub struct ToolRegistry {
    tools: DashMap<String, RegisteredTool>,
    change_seq: AtomicU64,
    change_tx: watch::Sender<u64>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        let (change_tx, _) = watch::channel(0);
        Self {
            tools: DashMap::new(),
            change_seq: AtomicU64::new(0),
            change_tx,
        }
    }

    /// Register a tool. Returns true if the name was not present before
    /// (membership changed); replacing an existing record returns false.
    pub fn register(&self, tool: Tool, handler: ToolHandler) -> bool {
        self.insert(tool, handler, false)
    }

    /// Register a meta tool: same as [`register`](Self::register) but the
    /// tool survives `reset` and ignores `unregister`.
    pub fn register_meta(&self, tool: Tool, handler: ToolHandler) -> bool {
        self.insert(tool, handler, true)
    }

    fn insert(&self, tool: Tool, handler: ToolHandler, meta: bool) -> bool {
        let name = tool.name.clone();
        self.tools
            .insert(
                name,
                RegisteredTool {
                    tool,
                    handler,
                    meta,
                },
            )
            .is_none()
    }

    /// Remove tools by name. Meta tools are skipped. Returns how many
    /// entries were actually removed.
    pub fn unregister<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut removed = 0;
        for name in names {
            let name = name.as_ref();
            let is_meta = self
                .tools
                .get(name)
                .map(|entry| entry.meta)
                .unwrap_or(false);
            if is_meta {
                continue;
            }
            if self.tools.remove(name).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Drop every tool except the meta tools. Returns how many entries
    /// were removed.
    pub fn reset(&self) -> usize {
        let before = self.tools.len();
        self.tools.retain(|_, entry| entry.meta);
        before - self.tools.len()
    }

    /// Whether a tool with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Number of registered tools (meta included).
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Sorted names of all registered tools.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Tool definitions for `tools/list`, sorted by name.
    pub fn list(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self.tools.iter().map(|e| e.tool.clone()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Invoke a tool by name.
    ///
    /// The handler is cloned out of the map before awaiting so no map
    /// shard lock is held across the call.
    pub async fn call(
        &self,
        name: &str,
        arguments: Value,
        cancel: CancellationToken,
    ) -> Result<CallToolResult, ErrorData> {
        let handler = self
            .tools
            .get(name)
            .map(|entry| Arc::clone(&entry.handler))
            .ok_or_else(|| ErrorData::tool_not_found(name))?;
        handler(arguments, cancel).await
    }

    /// Emit one tools-list-changed notification.
    pub fn notify_list_changed(&self) {
        let seq = self.change_seq.fetch_add(1, Ordering::SeqCst) + 1;
        // Receivers may not exist yet (startup registration); that's fine.
        let _ = self.change_tx.send(seq);
    }

    /// Subscribe to list-changed notifications.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.change_tx.subscribe()
    }

    /// Total number of list-changed notifications emitted so far.
    pub fn change_count(&self) -> u64 {
        self.change_seq.load(Ordering::SeqCst)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
