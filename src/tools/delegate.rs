//! Agent delegation tool for AgentSwarm
//!
//! A `DelegationTool` is the synthetic tool an agent sees for each of its
//! `delegates_to` targets. It carries the target agent's *name*, never a
//! pointer: resolution goes through the swarm's agent map at call time, which
//! keeps mutually-delegating agents free of ownership cycles.
//!
//! The scheduler routes delegation calls specially (pre/post_delegation hooks
//! instead of tool hooks, caller-local semaphore slot only); this tool only
//! performs the actual hand-off: run the target agent's turn to completion
//! and return its final message content.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::agent::AgentRunner;
use crate::error::{Result, SwarmError};

use super::{Tool, ToolContext};

/// Synthetic tool that runs another agent to completion.
pub struct DelegationTool {
    target: String,
    description: String,
}

impl DelegationTool {
    /// Create a delegation tool for `target`, described to the model with the
    /// target's own description.
    pub fn new(target: impl Into<String>, target_description: &str) -> Self {
        let target = target.into();
        Self {
            description: format!(
                "Delegate a task to the '{}' agent ({}). The agent works with its own \
                 conversation and tools and returns its final answer.",
                target, target_description
            ),
            target,
        }
    }

    /// The target agent's name.
    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl Tool for DelegationTool {
    fn name(&self) -> &str {
        &self.target
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "The task for the agent to complete"
                }
            },
            "required": ["task"]
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let task = args
            .get("task")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'task' argument".into()))?;

        let core = ctx
            .swarm
            .as_ref()
            .ok_or_else(|| SwarmError::Tool("Delegation requires a swarm context".into()))?;
        let agent = core.agent(&self.target).ok_or_else(|| {
            SwarmError::Tool(format!("Unknown delegate agent: '{}'", self.target))
        })?;

        info!(
            caller = ctx.agent(),
            delegate = %self.target,
            task_len = task.len(),
            "Delegating task"
        );

        let runner = AgentRunner::new(Arc::clone(core), agent);
        let reply = runner.ask_boxed(task.to_string()).await?;
        Ok(reply.content)
    }
}
