//! AgentSwarm - multi-agent LLM orchestration
//!
//! A single-process framework that executes collaborative LLM-backed agents:
//! a swarm of agents with one lead, inter-agent delegation, two-level rate
//! limiting (a global semaphore plus one per agent), a lifecycle hook system
//! that can steer execution, permission-gated built-in tools, a structured
//! log event stream, and an optional node-workflow DAG chaining independent
//! swarm executions.
//!
//! The core depends on two capability traits the embedding application
//! provides: [`LlmDriver`] (one chat completion per call, usage reporting,
//! optional streaming) and [`ToolSource`] (extra tool implementations, e.g.
//! an MCP client adapter).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agentswarm::{AgentDefinition, Swarm};
//!
//! let swarm = Swarm::builder()
//!     .name("review-team")
//!     .driver(Arc::new(my_driver))
//!     .agent(
//!         AgentDefinition::new("lead", "Lead reviewer", "You lead the review.", ".")
//!             .delegates_to(["researcher"]),
//!     )
//!     .agent(AgentDefinition::new(
//!         "researcher",
//!         "Digs through the codebase",
//!         "You research.",
//!         ".",
//!     ))
//!     .lead("lead")
//!     .build()?;
//!
//! let result = swarm.execute("Review the open pull request").await;
//! println!("{}", result.content);
//! ```

pub mod agent;
pub mod builder;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod hooks;
pub mod logging;
pub mod message;
pub mod node;
pub mod state;
pub mod swarm;
pub mod tools;

pub use agent::{Agent, AgentDefinition, AgentRunner, ContextTracker, ToolSpec};
pub use builder::SwarmBuilder;
pub use config::{load_config_file, load_config_str, SwarmBlueprint};
pub use driver::{ChatReply, ChatRequest, LlmDriver, ToolSchema, ToolSource, Usage};
pub use error::{Result, SwarmError};
pub use events::{EventCollector, ExecutionStatus, LogEvent, Subscriber};
pub use hooks::{
    Callback, HookContext, HookEvent, HookRegistration, HookRegistry, HookResult, Matcher,
    ShellHook,
};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use message::{Message, Role, ToolCall, ToolResult};
pub use node::{
    NodeDefinition, NodeGraph, NodeOrchestrator, NodeResult, Transformer, TransformerContext,
    TransformerOutcome, WorkflowResult,
};
pub use state::{ReadTracker, Scratchpad, TodoItem, TodoStatus, TodoStore};
pub use swarm::{ExecutionResult, Swarm};
pub use tools::{Tool, ToolContext, ToolPermissions, ToolRegistry};
