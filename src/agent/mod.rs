//! Agent module - runtime agents and the turn scheduler
//!
//! An [`AgentDefinition`] describes an agent; a runtime [`Agent`] adds the
//! mutable pieces that live for the duration of a swarm: ordered message
//! history, the owned tool set, cumulative context accounting, the per-agent
//! hook registry and the per-agent concurrency limit.
//!
//! [`AgentRunner`] executes one agent turn: drive the LLM, run requested
//! tools in parallel under the swarm's two-level rate limits, feed results
//! back, and loop until the model produces a final message.

mod context;
mod definition;
mod runner;

pub use context::{ContextTracker, ContextWarning, WARNING_THRESHOLDS};
pub use definition::{
    AgentDefinition, ToolSourceRef, ToolSpec, DEFAULT_AGENT_TIMEOUT_SECS, DEFAULT_CONTEXT_WINDOW,
    DEFAULT_MODEL, DEFAULT_PROVIDER,
};
pub use runner::AgentRunner;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::{Result, SwarmError};
use crate::hooks::HookRegistry;
use crate::message::Message;
use crate::tools::ToolRegistry;

/// A runtime agent: definition plus conversation and scheduling state.
///
/// Agents are created lazily on the first execute call, survive the whole
/// call (including reprompts), and are disposed with the swarm. Node
/// workflows build a fresh agent per node.
pub struct Agent {
    definition: AgentDefinition,
    directory: PathBuf,
    pub(crate) history: tokio::sync::Mutex<Vec<Message>>,
    pub(crate) tools: ToolRegistry,
    pub(crate) local_semaphore: Arc<Semaphore>,
    pub(crate) context: ContextTracker,
    pub(crate) hooks: HookRegistry,
    pub(crate) first_turn_done: AtomicBool,
    pub(crate) messages_since_todo: AtomicUsize,
    pub(crate) delegation_call_ids: std::sync::Mutex<HashMap<String, String>>,
}

impl Agent {
    /// Build a runtime agent from its definition and assembled tool set.
    pub(crate) fn new(
        definition: AgentDefinition,
        tools: ToolRegistry,
        local_permits: usize,
    ) -> Result<Self> {
        definition.validate()?;
        let directory = definition.directory.canonicalize().map_err(|e| {
            SwarmError::Config(format!(
                "agent '{}' directory '{}': {}",
                definition.name,
                definition.directory.display(),
                e
            ))
        })?;
        let context = ContextTracker::new(definition.context_window);
        Ok(Self {
            definition,
            directory,
            history: tokio::sync::Mutex::new(Vec::new()),
            tools,
            local_semaphore: Arc::new(Semaphore::new(local_permits.max(1))),
            context,
            hooks: HookRegistry::new(),
            first_turn_done: AtomicBool::new(false),
            messages_since_todo: AtomicUsize::new(0),
            delegation_call_ids: std::sync::Mutex::new(HashMap::new()),
        })
    }

    /// The agent's definition.
    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    /// The agent's name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// The canonical working directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Cumulative context accounting.
    pub fn context(&self) -> &ContextTracker {
        &self.context
    }

    /// The per-agent hook registry.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Names of tools this agent owns, in registration order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.names()
    }

    /// Snapshot of the conversation history.
    pub async fn history(&self) -> Vec<Message> {
        self.history.lock().await.clone()
    }

    /// Whether `name` is one of this agent's delegation targets.
    pub fn is_delegation_target(&self, name: &str) -> bool {
        self.definition.delegates_to.iter().any(|t| t == name)
    }

    /// Delegation call ids recorded so far, mapped to target names.
    pub fn delegation_call_ids(&self) -> HashMap<String, String> {
        self.delegation_call_ids
            .lock()
            .expect("delegation id lock")
            .clone()
    }

    /// Append messages to the history, bumping the TodoWrite reminder counter.
    pub(crate) async fn push_messages(&self, messages: Vec<Message>) {
        let count = messages.len();
        let mut history = self.history.lock().await;
        history.extend(messages);
        self.messages_since_todo.fetch_add(count, Ordering::SeqCst);
    }
}
