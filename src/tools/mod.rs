//! Tools module - tool definitions and execution for LLM function calling
//!
//! This module provides the infrastructure for defining and executing tools
//! that agents can call during a turn, plus the built-in tool set.
//!
//! # Overview
//!
//! - `Tool` trait: the interface all tools implement
//! - `ToolContext`: execution context (agent identity, directory, shared state)
//! - `ToolRegistry`: lookup and schema extraction for an agent's tool set
//! - `PermissionedTool`: decorator enforcing allow/deny path glob rules
//!
//! # Built-in tools
//!
//! - `ReadTool` / `WriteTool` / `EditTool` / `MultiEditTool`: file operations
//!   with per-agent read-before-write enforcement
//! - `BashTool`: shell execution with timeout
//! - `GrepTool` / `GlobTool`: recursive search rooted at a directory
//! - `TodoWriteTool`: replaces the agent's todo list
//! - `ScratchpadWriteTool` / `ScratchpadReadTool` / `ScratchpadListTool`:
//!   swarm-shared session KV
//! - `ThinkTool`: no-op reasoning sink
//! - `DelegationTool`: synthetic tool that runs another agent to completion

pub mod delegate;
pub mod file;
pub mod permissions;
mod registry;
pub mod scratchpad;
pub mod search;
pub mod shell;
pub mod think;
pub mod todo;

pub use delegate::DelegationTool;
pub use file::{EditTool, MultiEditTool, ReadTool, WriteTool};
pub use permissions::{PermissionedTool, ToolPermissions};
pub use registry::ToolRegistry;
pub use scratchpad::{ScratchpadListTool, ScratchpadReadTool, ScratchpadWriteTool};
pub use search::{GlobTool, GrepTool};
pub use shell::BashTool;
pub use think::ThinkTool;
pub use todo::TodoWriteTool;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::driver::ToolSchema;
use crate::error::{Result, SwarmError};
use crate::state::{ReadTracker, Scratchpad, TodoStore};

/// Trait that all tools must implement.
///
/// Tools return `Result<String>`; the scheduler converts an `Err` into a
/// `ToolResult { success: false, .. }` fed back to the LLM, so tool failures
/// never abort a turn.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool name the LLM uses to call it. Unique within an agent.
    fn name(&self) -> &str;

    /// Description sent to the LLM.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String>;
}

/// Build the LLM-facing schema for a tool.
pub fn schema_of(tool: &dyn Tool) -> ToolSchema {
    ToolSchema::new(tool.name(), tool.description(), tool.parameters())
}

/// Context provided to tools during execution.
///
/// Carries the calling agent's identity and working directory plus handles to
/// the swarm-shared state stores. File paths in tool arguments resolve
/// relative to `directory`.
#[derive(Clone)]
pub struct ToolContext {
    agent: String,
    directory: PathBuf,
    read_tracker: Arc<ReadTracker>,
    todos: Arc<TodoStore>,
    scratchpad: Arc<Scratchpad>,
    cancel: CancellationToken,
    pub(crate) swarm: Option<Arc<crate::swarm::SwarmCore>>,
}

impl ToolContext {
    /// Create a standalone context with fresh state stores.
    ///
    /// Primarily useful for exercising tools outside a swarm (tests, custom
    /// embeddings). Inside a swarm the runner builds contexts that share the
    /// swarm's stores.
    pub fn new(agent: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            agent: agent.into(),
            directory: directory.into(),
            read_tracker: Arc::new(ReadTracker::new()),
            todos: Arc::new(TodoStore::new()),
            scratchpad: Arc::new(Scratchpad::new()),
            cancel: CancellationToken::new(),
            swarm: None,
        }
    }

    /// Replace the read tracker handle.
    pub fn with_read_tracker(mut self, tracker: Arc<ReadTracker>) -> Self {
        self.read_tracker = tracker;
        self
    }

    /// Replace the todo store handle.
    pub fn with_todos(mut self, todos: Arc<TodoStore>) -> Self {
        self.todos = todos;
        self
    }

    /// Replace the scratchpad handle.
    pub fn with_scratchpad(mut self, scratchpad: Arc<Scratchpad>) -> Self {
        self.scratchpad = scratchpad;
        self
    }

    /// Replace the cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub(crate) fn with_swarm(mut self, swarm: Arc<crate::swarm::SwarmCore>) -> Self {
        self.swarm = Some(swarm);
        self
    }

    /// Name of the calling agent.
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// The agent's working directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Per-agent read-before-write tracker.
    pub fn read_tracker(&self) -> &ReadTracker {
        &self.read_tracker
    }

    /// Per-agent todo lists.
    pub fn todos(&self) -> &TodoStore {
        &self.todos
    }

    /// Swarm-shared scratchpad.
    pub fn scratchpad(&self) -> &Scratchpad {
        &self.scratchpad
    }

    /// Cancellation token for cooperative abort.
    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Resolve a path argument against the agent directory and canonicalize it.
///
/// The target must exist. Empty paths are refused.
pub(crate) fn resolve_existing(raw: &str, ctx: &ToolContext) -> Result<PathBuf> {
    let joined = join_directory(raw, ctx)?;
    joined
        .canonicalize()
        .map_err(|e| SwarmError::Tool(format!("File not found: '{}': {}", joined.display(), e)))
}

/// Resolve a path argument for a write target.
///
/// The parent directory must exist and is canonicalized; the file itself may
/// not exist yet.
pub(crate) fn resolve_for_write(raw: &str, ctx: &ToolContext) -> Result<PathBuf> {
    let joined = join_directory(raw, ctx)?;
    let file_name = joined
        .file_name()
        .ok_or_else(|| SwarmError::Tool(format!("Invalid file path: '{}'", raw)))?
        .to_os_string();
    let parent = joined.parent().unwrap_or(Path::new("."));
    let parent = parent.canonicalize().map_err(|e| {
        SwarmError::Tool(format!(
            "Parent directory not found: '{}': {}",
            parent.display(),
            e
        ))
    })?;
    Ok(parent.join(file_name))
}

fn join_directory(raw: &str, ctx: &ToolContext) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        return Err(SwarmError::Tool("Path must not be empty".to_string()));
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(ctx.directory().join(path))
    }
}

/// Construct the default tool set every agent receives unless
/// `include_default_tools` is false.
pub fn default_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ReadTool),
        Arc::new(WriteTool),
        Arc::new(EditTool),
        Arc::new(MultiEditTool),
        Arc::new(BashTool::new()),
        Arc::new(GrepTool),
        Arc::new(GlobTool),
        Arc::new(TodoWriteTool),
        Arc::new(ScratchpadWriteTool),
        Arc::new(ScratchpadReadTool),
        Arc::new(ScratchpadListTool),
        Arc::new(ThinkTool),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_context_accessors() {
        let ctx = ToolContext::new("alpha", "/tmp");
        assert_eq!(ctx.agent(), "alpha");
        assert_eq!(ctx.directory(), Path::new("/tmp"));
        assert!(ctx.swarm.is_none());
    }

    #[test]
    fn test_default_tools_unique_names() {
        use std::collections::HashSet;
        let tools = default_tools();
        let names: HashSet<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names.len(), tools.len());
        assert!(names.contains("Read"));
        assert!(names.contains("Bash"));
        assert!(names.contains("TodoWrite"));
    }

    #[test]
    fn test_resolve_existing_relative() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let ctx = ToolContext::new("alpha", dir.path());

        let resolved = resolve_existing("a.txt", &ctx).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("a.txt"));
    }

    #[test]
    fn test_resolve_existing_refuses_empty() {
        let ctx = ToolContext::new("alpha", "/tmp");
        let err = resolve_existing("  ", &ctx).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_resolve_for_write_missing_file_ok() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new("alpha", dir.path());
        let resolved = resolve_for_write("new.txt", &ctx).unwrap();
        assert!(resolved.ends_with("new.txt"));
        assert!(!resolved.exists());
    }

    #[test]
    fn test_resolve_for_write_missing_parent_fails() {
        let dir = tempdir().unwrap();
        let ctx = ToolContext::new("alpha", dir.path());
        assert!(resolve_for_write("no/such/dir/file.txt", &ctx).is_err());
    }

    #[test]
    fn test_schema_of() {
        let schema = schema_of(&ThinkTool);
        assert_eq!(schema.name, "Think");
        assert!(schema.parameters["properties"]["thought"].is_object());
    }
}
