//! Hook system for AgentSwarm
//!
//! User-supplied callbacks fire at lifecycle points of a swarm execution and
//! can steer it: halt an operation, replace a tool result, or reprompt the
//! lead agent after `swarm_stop`.
//!
//! # Dispatch
//!
//! Registrations live in two registries: swarm defaults (apply to every
//! agent) and per-agent. For an event, matching registrations from both are
//! stable-sorted by priority descending and invoked sequentially; the first
//! `Halt`/`Replace`/`Reprompt` wins. Default observers register at priority
//! −100 so they always run last and never steer.
//!
//! # Matchers
//!
//! A string matcher is an anchored regex evaluated against the tool name
//! (tool events) or the delegate name (delegation events). No matcher
//! matches everything.
//!
//! # Callbacks
//!
//! A callback is either a native closure or a shell-command descriptor; the
//! engine treats both identically through [`Callback::invoke`]. A callback
//! returning `Err` is converted to `Halt` and logged with a `callback_error`
//! event.

mod executor;
mod registry;
mod shell;

pub use executor::dispatch;
pub use registry::HookRegistry;
pub use shell::ShellHook;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SwarmError};
use crate::message::{ToolCall, ToolResult};

/// Lifecycle events hooks can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// Swarm execution entry. May halt.
    SwarmStart,
    /// First user turn of an agent, once per agent lifetime. May halt.
    FirstMessage,
    /// Every user turn. May halt.
    UserPrompt,
    /// After each LLM response. Observe only.
    AgentStop,
    /// Before each non-delegation tool call. May halt or replace.
    PreToolUse,
    /// After each non-delegation tool call. May replace.
    PostToolUse,
    /// Before each delegation call. May halt or replace.
    PreDelegation,
    /// After each delegation call. May replace.
    PostDelegation,
    /// First crossing of a context usage threshold. Observe only.
    ContextWarning,
    /// Swarm execution exit. May reprompt.
    SwarmStop,
}

impl HookEvent {
    /// The event name as it appears in configuration and shell payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::SwarmStart => "swarm_start",
            HookEvent::FirstMessage => "first_message",
            HookEvent::UserPrompt => "user_prompt",
            HookEvent::AgentStop => "agent_stop",
            HookEvent::PreToolUse => "pre_tool_use",
            HookEvent::PostToolUse => "post_tool_use",
            HookEvent::PreDelegation => "pre_delegation",
            HookEvent::PostDelegation => "post_delegation",
            HookEvent::ContextWarning => "context_warning",
            HookEvent::SwarmStop => "swarm_stop",
        }
    }

    /// Whether a `Replace` result is meaningful for this event.
    pub fn supports_replace(&self) -> bool {
        matches!(
            self,
            HookEvent::PreToolUse
                | HookEvent::PostToolUse
                | HookEvent::PreDelegation
                | HookEvent::PostDelegation
        )
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Steering result returned by a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookResult {
    /// Proceed to the next callback (or the operation itself).
    Continue,
    /// Stop the operation; the message becomes the observable outcome.
    Halt(String),
    /// Replace the value in flight (tool result content, delegation result).
    Replace(String),
    /// Restart the lead agent with a new prompt. Only valid for `swarm_stop`.
    Reprompt(String),
}

impl HookResult {
    /// Whether this result stops dispatch.
    pub fn is_steering(&self) -> bool {
        !matches!(self, HookResult::Continue)
    }
}

/// Context handed to every callback.
///
/// The metadata map is shared state callbacks may mutate to pass information
/// along the dispatch chain.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// The event being dispatched
    pub event: HookEvent,
    /// Name of the owning swarm
    pub swarm_name: String,
    /// The agent the event concerns, when applicable
    pub agent: Option<String>,
    /// The user prompt, for prompt-shaped events
    pub prompt: Option<String>,
    /// The tool call in flight, for tool events
    pub tool_call: Option<ToolCall>,
    /// The tool result, for post-tool events
    pub tool_result: Option<ToolResult>,
    /// Delegate agent name, for delegation events
    pub delegation_target: Option<String>,
    /// Delegate's final content, for post-delegation
    pub delegation_result: Option<String>,
    /// Project directory exported to shell hooks as SWARM_PROJECT_DIR
    pub project_dir: Option<PathBuf>,
    /// Mutable metadata passed along the dispatch chain
    pub metadata: HashMap<String, Value>,
}

impl HookContext {
    /// Create a context for `event` in the named swarm.
    pub fn new(event: HookEvent, swarm_name: impl Into<String>) -> Self {
        Self {
            event,
            swarm_name: swarm_name.into(),
            agent: None,
            prompt: None,
            tool_call: None,
            tool_result: None,
            delegation_target: None,
            delegation_result: None,
            project_dir: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the agent name.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Set the prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Set the tool call in flight.
    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_call = Some(call);
        self
    }

    /// Set the tool result.
    pub fn with_tool_result(mut self, result: ToolResult) -> Self {
        self.tool_result = Some(result);
        self
    }

    /// Set the delegation target.
    pub fn with_delegation_target(mut self, target: impl Into<String>) -> Self {
        self.delegation_target = Some(target.into());
        self
    }

    /// Set the delegation result.
    pub fn with_delegation_result(mut self, result: impl Into<String>) -> Self {
        self.delegation_result = Some(result.into());
        self
    }

    /// Set the project directory exported to shell hooks.
    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    /// The subject a matcher is evaluated against: the tool name for tool
    /// events, the delegate name for delegation events.
    pub(crate) fn matcher_target(&self) -> Option<&str> {
        match self.event {
            HookEvent::PreToolUse | HookEvent::PostToolUse => {
                self.tool_call.as_ref().map(|c| c.name.as_str())
            }
            HookEvent::PreDelegation | HookEvent::PostDelegation => {
                self.delegation_target.as_deref()
            }
            _ => None,
        }
    }

    /// The JSON payload written to a shell hook's stdin.
    pub(crate) fn shell_payload(&self) -> Value {
        let mut payload = serde_json::Map::new();
        payload.insert("event".into(), Value::String(self.event.as_str().into()));
        payload.insert("swarm".into(), Value::String(self.swarm_name.clone()));
        if let Some(agent) = &self.agent {
            payload.insert("agent".into(), Value::String(agent.clone()));
        }
        if let Some(prompt) = &self.prompt {
            payload.insert("prompt".into(), Value::String(prompt.clone()));
        }
        if let Some(call) = &self.tool_call {
            payload.insert("tool_call".into(), serde_json::json!(call));
        }
        if let Some(result) = &self.tool_result {
            payload.insert("tool_result".into(), serde_json::json!(result));
        }
        if let Some(target) = &self.delegation_target {
            payload.insert("delegation_target".into(), Value::String(target.clone()));
        }
        if let Some(result) = &self.delegation_result {
            payload.insert("delegation_result".into(), Value::String(result.clone()));
        }
        if !self.metadata.is_empty() {
            payload.insert(
                "metadata".into(),
                Value::Object(self.metadata.clone().into_iter().collect()),
            );
        }
        Value::Object(payload)
    }
}

/// Anchored-regex matcher for hook registrations.
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: Regex,
    source: String,
}

impl Matcher {
    /// Compile a matcher from a pattern string (or literal tool name).
    pub fn new(pattern: &str) -> Result<Self> {
        let anchored = format!("^(?:{})$", pattern);
        let compiled = Regex::new(&anchored)
            .map_err(|e| SwarmError::Config(format!("Invalid hook matcher '{}': {}", pattern, e)))?;
        Ok(Self {
            pattern: compiled,
            source: pattern.to_string(),
        })
    }

    /// Evaluate against a target. Events without a subject always match.
    pub fn matches(&self, target: Option<&str>) -> bool {
        match target {
            Some(target) => self.pattern.is_match(target),
            None => true,
        }
    }

    /// The original pattern string.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Native callback signature. Callbacks run on the swarm's scheduler and
/// should stay short; long-running side effects belong in shell hooks.
pub type NativeHookFn = dyn Fn(&mut HookContext) -> Result<HookResult> + Send + Sync;

/// A hook callback: a native closure or a shell-command descriptor.
#[derive(Clone)]
pub enum Callback {
    /// In-process closure
    Native(Arc<NativeHookFn>),
    /// Subprocess following the shell hook protocol
    Shell(ShellHook),
}

impl Callback {
    /// Wrap a closure.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&mut HookContext) -> Result<HookResult> + Send + Sync + 'static,
    {
        Callback::Native(Arc::new(f))
    }

    /// A shell-command callback with the default 60 second timeout.
    pub fn shell(command: impl Into<String>) -> Self {
        Callback::Shell(ShellHook::new(command))
    }

    /// Invoke the callback against the context.
    pub async fn invoke(&self, ctx: &mut HookContext) -> Result<HookResult> {
        match self {
            Callback::Native(f) => f(ctx),
            Callback::Shell(hook) => hook.run(ctx).await,
        }
    }
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callback::Native(_) => f.write_str("Callback::Native"),
            Callback::Shell(hook) => write!(f, "Callback::Shell({})", hook.command),
        }
    }
}

/// One hook registration.
#[derive(Debug, Clone)]
pub struct HookRegistration {
    /// The event this registration fires on
    pub event: HookEvent,
    /// Optional matcher against the event's subject
    pub matcher: Option<Matcher>,
    /// Higher priorities run earlier; default observers use −100
    pub priority: i32,
    /// The callback to invoke
    pub callback: Callback,
}

impl HookRegistration {
    /// Create a registration at priority 0 with no matcher.
    pub fn new(event: HookEvent, callback: Callback) -> Self {
        Self {
            event,
            matcher: None,
            priority: 0,
            callback,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the matcher from a pattern string.
    pub fn with_matcher(mut self, pattern: &str) -> Result<Self> {
        self.matcher = Some(Matcher::new(pattern)?);
        Ok(self)
    }
}
