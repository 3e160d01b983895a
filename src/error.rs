//! Error types for AgentSwarm
//!
//! This module defines all error types used throughout the orchestration core.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! Tool failures are deliberately *not* part of this taxonomy at the scheduler
//! surface: a failing tool produces a `ToolResult { success: false, .. }` that
//! is fed back to the LLM so it can adapt. Only fatal conditions (invalid
//! configuration, driver failure, mutation of a frozen registry) propagate as
//! `SwarmError`.

use thiserror::Error;

/// The primary error type for AgentSwarm operations.
#[derive(Error, Debug)]
pub enum SwarmError {
    /// Configuration-related errors (invalid YAML shape, missing required
    /// fields, unresolved agent references, bad env interpolation, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A cycle was detected in the delegation graph or the node dependency
    /// graph. Configuration loading fails before any execution.
    #[error("Cycle detected: {0}")]
    Cycle(String),

    /// Driver-level failure (timeout, transport, protocol). Captured into the
    /// execution result; `swarm_stop` still fires.
    #[error("LLM driver error: {0}")]
    Llm(String),

    /// Tool execution errors. Converted to `ToolResult` data before reaching
    /// the LLM; the message is the exact content the model sees.
    #[error("{0}")]
    Tool(String),

    /// A tool was denied access to a path by its permission rule set.
    /// Surfaced as a `ToolResult` failure naming the path and allowed globs.
    #[error("Permission denied: cannot access '{path}'. Allowed paths: {allowed:?}")]
    PermissionDenied {
        /// The canonical path the tool attempted to touch.
        path: String,
        /// The configured allow globs for the tool.
        allowed: Vec<String>,
    },

    /// Mutation of a registry that is frozen for the duration of an execute
    /// call (hook registrations, log subscribers).
    #[error("State error: {0}")]
    State(String),

    /// A node workflow was halted by a transformer or a failed node.
    #[error("Workflow halted: {0}")]
    Workflow(String),

    /// Execution was cancelled through the swarm's cancellation handle.
    #[error("Execution cancelled")]
    Cancelled,

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse errors from the configuration loader
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A specialized `Result` type for AgentSwarm operations.
pub type Result<T> = std::result::Result<T, SwarmError>;

impl SwarmError {
    /// The content string a failing tool call reports back to the LLM.
    ///
    /// `Tool` errors carry the exact model-facing message; other variants are
    /// prefixed so the model can tell an infrastructure failure from a tool
    /// protocol failure.
    pub fn tool_result_content(&self) -> String {
        match self {
            SwarmError::Tool(msg) => msg.clone(),
            SwarmError::Cancelled => "cancelled".to_string(),
            other => format!("Error: {}", other),
        }
    }
}
