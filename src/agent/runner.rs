//! Agent turn execution for AgentSwarm
//!
//! [`AgentRunner::ask`] drives one agent turn to completion: reminder
//! injection, prompt hooks, then the complete-loop of LLM calls and parallel
//! tool execution until the model stops requesting tools.
//!
//! Scheduling rules:
//!
//! - every LLM call holds one global and one local semaphore permit
//! - a batch of K > 1 tool calls runs concurrently; each regular tool task
//!   acquires the global semaphore, then the agent's local semaphore
//! - a delegation task holds only the caller's local slot while waiting on
//!   the delegate, whose own LLM calls acquire their own permits
//! - tool results are appended in the order the assistant requested them,
//!   regardless of completion order
//! - cancellation aborts at the next suspension point; aborted calls record
//!   a "cancelled" tool result

use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

use crate::driver::{ChatReply, ChatRequest};
use crate::error::{Result, SwarmError};
use crate::events::{now, LogEvent};
use crate::hooks::{dispatch, HookContext, HookEvent, HookResult};
use crate::message::{Message, ToolCall, ToolResult};
use crate::swarm::SwarmCore;
use crate::tools::ToolContext;

use super::Agent;

/// Turns without a TodoWrite before the periodic reminder is injected.
pub(crate) const TODO_REMINDER_INTERVAL: usize = 8;

/// Guidance injected before the first user message of every agent. Rendered
/// with the environment line by [`first_message_reminder`].
const FIRST_TURN_GUIDANCE: &str = "You are one agent in a \
collaborative swarm. Work from your own directory, use your tools to act rather than \
describing actions, and hand work to the specialist agents listed among your tools when a \
task matches their description.";

/// Injected after the first user message: todo-list guidance.
const AFTER_FIRST_MESSAGE_REMINDER: &str = "<system-reminder>\nFor multi-step work, keep a \
todo list with the TodoWrite tool: record the steps you plan to take, keep exactly one item \
in_progress, and mark items completed as soon as they are done.\n</system-reminder>";

/// Injected when the todo list has gone stale.
const PERIODIC_TODO_REMINDER: &str = "<system-reminder>\nYour todo list has not changed in a \
while. If you are in the middle of multi-step work, bring it up to date with TodoWrite before \
continuing.\n</system-reminder>";

/// Render the first-turn reminder with its environment line. The parameter
/// set is fixed: working directory, platform, architecture, date.
fn first_message_reminder(directory: &std::path::Path) -> String {
    format!(
        "<system-reminder>\n{}\nEnvironment: cwd={} platform={} arch={} date={}\n</system-reminder>",
        FIRST_TURN_GUIDANCE,
        directory.display(),
        std::env::consts::OS,
        std::env::consts::ARCH,
        now().format("%Y-%m-%d"),
    )
}

/// Executes turns for one agent inside a swarm.
pub struct AgentRunner {
    core: Arc<SwarmCore>,
    agent: Arc<Agent>,
}

impl AgentRunner {
    /// Create a runner for `agent` inside `core`.
    pub(crate) fn new(core: Arc<SwarmCore>, agent: Arc<Agent>) -> Self {
        Self { core, agent }
    }

    /// Run one full turn and return the agent's final assistant message.
    pub async fn ask(&self, prompt: &str) -> Result<Message> {
        if self.core.cancel.is_cancelled() {
            return Err(SwarmError::Cancelled);
        }

        let first_turn = !self.agent.first_turn_done.swap(true, Ordering::SeqCst);

        // Compose and append the turn's opening messages under one lock so a
        // concurrent delegation to the same agent cannot interleave.
        {
            let mut history = self.agent.history.lock().await;
            let before = history.len();
            if history.is_empty() {
                history.push(Message::system(&self.agent.definition().system_prompt));
            }
            if first_turn {
                history.push(Message::user(first_message_reminder(self.agent.directory())));
                history.push(Message::user(prompt));
                history.push(Message::user(AFTER_FIRST_MESSAGE_REMINDER));
            } else {
                if self.agent.messages_since_todo.load(Ordering::SeqCst) >= TODO_REMINDER_INTERVAL {
                    history.push(Message::user(PERIODIC_TODO_REMINDER));
                    self.agent.messages_since_todo.store(0, Ordering::SeqCst);
                }
                history.push(Message::user(prompt));
            }
            let appended = history.len() - before;
            self.agent
                .messages_since_todo
                .fetch_add(appended, Ordering::SeqCst);
        }

        if first_turn {
            let mut ctx = self.hook_ctx(HookEvent::FirstMessage).with_prompt(prompt);
            if let HookResult::Halt(text) = self.dispatch_hooks(&mut ctx).await {
                return self.halt_turn(text).await;
            }
        }
        let mut ctx = self.hook_ctx(HookEvent::UserPrompt).with_prompt(prompt);
        if let HookResult::Halt(text) = self.dispatch_hooks(&mut ctx).await {
            return self.halt_turn(text).await;
        }

        self.complete().await
    }

    /// Boxed entry point for delegation recursion.
    pub(crate) fn ask_boxed(&self, prompt: String) -> BoxFuture<'_, Result<Message>> {
        Box::pin(async move { self.ask(&prompt).await })
    }

    /// Append and return the synthetic assistant message for a halted turn.
    async fn halt_turn(&self, text: String) -> Result<Message> {
        let message = Message::assistant(text);
        self.agent.push_messages(vec![message.clone()]).await;
        Ok(message)
    }

    /// The LLM/tool loop: drive, run tools, feed back, repeat until final.
    async fn complete(&self) -> Result<Message> {
        loop {
            let reply = self.drive_llm().await?;

            if !reply.has_tool_calls() {
                let message = Message::assistant(&reply.content);
                self.agent.push_messages(vec![message.clone()]).await;
                return Ok(message);
            }

            let calls = reply.tool_calls.clone();
            self.agent
                .push_messages(vec![Message::assistant_with_tools(&reply.content, calls.clone())])
                .await;

            let results = self.run_tool_calls(&calls).await;

            let todo_written = calls
                .iter()
                .zip(results.iter())
                .any(|(call, result)| call.name == "TodoWrite" && result.success);

            self.agent
                .push_messages(
                    results
                        .into_iter()
                        .map(|r| Message::tool_result(r.tool_call_id.clone(), r.content))
                        .collect(),
                )
                .await;

            if todo_written {
                self.agent.messages_since_todo.store(0, Ordering::SeqCst);
            }
        }
    }

    /// Issue one LLM request under the global and local semaphores, recording
    /// usage and context warnings.
    async fn drive_llm(&self) -> Result<ChatReply> {
        if self.core.cancel.is_cancelled() {
            return Err(SwarmError::Cancelled);
        }
        let definition = self.agent.definition();
        let messages = self.agent.history().await;
        let schemas = self.agent.tools.schemas();

        self.core.collector.emit(LogEvent::UserRequest {
            timestamp: now(),
            agent: self.agent.name().to_string(),
            model: definition.model.clone(),
            provider: definition.provider.clone(),
            message_count: messages.len(),
            tools: schemas.iter().map(|s| s.name.clone()).collect(),
            delegates_to: definition.delegates_to.clone(),
        });

        // Forward streaming deltas as events without touching control flow.
        let (delta_tx, mut delta_rx) = mpsc::unbounded_channel::<String>();
        let forwarder = {
            let core = Arc::clone(&self.core);
            let agent = self.agent.name().to_string();
            tokio::spawn(async move {
                while let Some(delta) = delta_rx.recv().await {
                    core.collector.emit(LogEvent::LlmStreamDelta {
                        timestamp: now(),
                        agent: agent.clone(),
                        content_delta: delta,
                    });
                }
            })
        };

        let request = ChatRequest {
            agent: self.agent.name().to_string(),
            model: definition.model.clone(),
            provider: definition.provider.clone(),
            base_url: definition.base_url.clone(),
            api_version: definition.api_version.clone(),
            headers: definition.headers.clone(),
            parameters: definition.parameters.clone(),
            messages,
            tools: schemas,
            timeout: definition.timeout,
            delta_sink: Some(delta_tx),
        };

        let reply = {
            let _global = acquire(&self.core.global_semaphore, &self.core).await?;
            let _local = acquire(&self.agent.local_semaphore, &self.core).await?;
            let cancelled = self.core.cancel.clone();
            tokio::select! {
                _ = cancelled.cancelled() => Err(SwarmError::Cancelled),
                outcome = tokio::time::timeout(definition.timeout, self.core.driver.chat(request)) => {
                    match outcome {
                        Ok(reply) => reply,
                        Err(_) => Err(SwarmError::Llm(format!(
                            "request timed out after {}s",
                            definition.timeout.as_secs()
                        ))),
                    }
                }
            }
        }?;
        let _ = forwarder.await;

        let usage = reply.usage.clone().unwrap_or_default();
        for warning in self.agent.context.record(&usage) {
            self.core.collector.emit(LogEvent::ContextLimitWarning {
                timestamp: now(),
                agent: self.agent.name().to_string(),
                threshold: warning.threshold,
                current_usage: warning.current_usage,
                tokens_used: warning.tokens_used,
                tokens_remaining: warning.tokens_remaining,
                context_limit: warning.context_limit,
            });
            let mut ctx = self.hook_ctx(HookEvent::ContextWarning);
            ctx.metadata
                .insert("threshold".into(), serde_json::json!(warning.threshold));
            self.dispatch_hooks(&mut ctx).await;
        }

        self.core.collector.emit(LogEvent::AgentStop {
            timestamp: now(),
            agent: self.agent.name().to_string(),
            model: definition.model.clone(),
            content: reply.content.clone(),
            tool_calls: reply.tool_calls.iter().map(|c| c.name.clone()).collect(),
            finish_reason: reply.finish_reason.clone(),
            usage,
        });
        let mut ctx = self.hook_ctx(HookEvent::AgentStop);
        self.dispatch_hooks(&mut ctx).await;

        Ok(reply)
    }

    /// Execute a batch of tool calls; results come back in request order.
    async fn run_tool_calls(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        if calls.len() == 1 {
            return vec![self.run_single(&calls[0], true).await];
        }
        debug!(
            agent = self.agent.name(),
            count = calls.len(),
            "Running tool calls in parallel"
        );
        join_all(calls.iter().map(|call| self.run_single(call, false))).await
    }

    /// Run one call under the scheduling rules for its kind.
    async fn run_single(&self, call: &ToolCall, inline: bool) -> ToolResult {
        if self.agent.is_delegation_target(&call.name) {
            // Delegation holds only the caller's local slot; the delegate's
            // own LLM calls acquire their own permits.
            let _local = match acquire(&self.agent.local_semaphore, &self.core).await {
                Ok(permit) => permit,
                Err(_) => return ToolResult::cancelled(&call.id),
            };
            self.run_delegation(call).await
        } else if inline {
            let _local = match acquire(&self.agent.local_semaphore, &self.core).await {
                Ok(permit) => permit,
                Err(_) => return ToolResult::cancelled(&call.id),
            };
            self.run_tool(call).await
        } else {
            // Fixed acquisition order: global before local.
            let _global = match acquire(&self.core.global_semaphore, &self.core).await {
                Ok(permit) => permit,
                Err(_) => return ToolResult::cancelled(&call.id),
            };
            let _local = match acquire(&self.agent.local_semaphore, &self.core).await {
                Ok(permit) => permit,
                Err(_) => return ToolResult::cancelled(&call.id),
            };
            self.run_tool(call).await
        }
    }

    /// A regular tool call: pre_tool_use, invoke, post_tool_use, events.
    async fn run_tool(&self, call: &ToolCall) -> ToolResult {
        let mut result = {
            let mut pre = self
                .hook_ctx(HookEvent::PreToolUse)
                .with_tool_call(call.clone());
            match self.dispatch_hooks(&mut pre).await {
                HookResult::Halt(text) => ToolResult::failure(&call.id, text),
                HookResult::Replace(content) => ToolResult::ok(&call.id, content),
                _ => {
                    let invoked = match self.agent.tools.get(&call.name) {
                        None => Err(SwarmError::Tool(format!("Tool not found: {}", call.name))),
                        Some(tool) => {
                            let ctx = self.tool_ctx();
                            let cancelled = self.core.cancel.clone();
                            tokio::select! {
                                _ = cancelled.cancelled() => Err(SwarmError::Cancelled),
                                outcome = tool.invoke(call.arguments.clone(), &ctx) => outcome,
                            }
                        }
                    };
                    let mut result = match invoked {
                        Ok(content) => ToolResult::ok(&call.id, content),
                        Err(SwarmError::Cancelled) => ToolResult::cancelled(&call.id),
                        Err(e) => {
                            warn!(agent = self.agent.name(), tool = %call.name, error = %e, "Tool failed");
                            ToolResult::failure(&call.id, e.tool_result_content())
                        }
                    };

                    let mut post = self
                        .hook_ctx(HookEvent::PostToolUse)
                        .with_tool_call(call.clone())
                        .with_tool_result(result.clone());
                    match self.dispatch_hooks(&mut post).await {
                        HookResult::Replace(content) => result.content = content,
                        HookResult::Halt(text) => {
                            result = ToolResult::failure(&call.id, text);
                        }
                        _ => {}
                    }
                    result
                }
            }
        };

        self.core.collector.emit(LogEvent::ToolCall {
            timestamp: now(),
            agent: self.agent.name().to_string(),
            tool_call_id: call.id.clone(),
            tool: call.name.clone(),
            arguments: call.arguments.clone(),
        });
        self.core.collector.emit(LogEvent::ToolResult {
            timestamp: now(),
            agent: self.agent.name().to_string(),
            tool_call_id: call.id.clone(),
            result: result.content.clone(),
        });

        // Normalize: failure results mirror their content into `error`.
        if !result.success && result.error.is_none() {
            result.error = Some(result.content.clone());
        }
        result
    }

    /// A delegation call: pre/post_delegation fire, tool hooks do not.
    async fn run_delegation(&self, call: &ToolCall) -> ToolResult {
        let target = call.name.clone();
        self.agent
            .delegation_call_ids
            .lock()
            .expect("delegation id lock")
            .insert(call.id.clone(), target.clone());

        let mut pre = self
            .hook_ctx(HookEvent::PreDelegation)
            .with_delegation_target(&target)
            .with_tool_call(call.clone());
        match self.dispatch_hooks(&mut pre).await {
            HookResult::Halt(text) => return ToolResult::failure(&call.id, text),
            // Replacement skips the delegate call entirely.
            HookResult::Replace(content) => return ToolResult::ok(&call.id, content),
            _ => {}
        }

        self.core.collector.emit(LogEvent::AgentDelegation {
            timestamp: now(),
            agent: self.agent.name().to_string(),
            tool_call_id: call.id.clone(),
            delegate_to: target.clone(),
            arguments: call.arguments.clone(),
        });

        let invoked = match self.agent.tools.get(&target) {
            None => Err(SwarmError::Tool(format!("Unknown delegate: {}", target))),
            Some(tool) => {
                let ctx = self.tool_ctx();
                let cancelled = self.core.cancel.clone();
                tokio::select! {
                    _ = cancelled.cancelled() => Err(SwarmError::Cancelled),
                    outcome = tool.invoke(call.arguments.clone(), &ctx) => outcome,
                }
            }
        };

        match invoked {
            Ok(content) => {
                let mut post = self
                    .hook_ctx(HookEvent::PostDelegation)
                    .with_delegation_target(&target)
                    .with_delegation_result(&content);
                let final_content = match self.dispatch_hooks(&mut post).await {
                    HookResult::Replace(replacement) => replacement,
                    HookResult::Halt(text) => {
                        return ToolResult::failure(&call.id, text);
                    }
                    _ => content,
                };
                self.core.collector.emit(LogEvent::DelegationResult {
                    timestamp: now(),
                    agent: self.agent.name().to_string(),
                    delegate_from: target,
                    tool_call_id: call.id.clone(),
                    result: final_content.clone(),
                });
                ToolResult::ok(&call.id, final_content)
            }
            Err(SwarmError::Cancelled) => ToolResult::cancelled(&call.id),
            Err(e) => {
                warn!(agent = self.agent.name(), delegate = %target, error = %e, "Delegation failed");
                self.core.collector.emit(LogEvent::DelegationError {
                    timestamp: now(),
                    agent: self.agent.name().to_string(),
                    delegate_to: target,
                    error_class: error_class(&e).to_string(),
                    error_message: e.to_string(),
                });
                ToolResult::failure(&call.id, e.tool_result_content())
            }
        }
    }

    fn hook_ctx(&self, event: HookEvent) -> HookContext {
        HookContext::new(event, &self.core.name)
            .with_agent(self.agent.name())
            .with_project_dir(self.agent.directory())
    }

    async fn dispatch_hooks(&self, ctx: &mut HookContext) -> HookResult {
        dispatch(
            &[&self.core.default_hooks, &self.agent.hooks],
            ctx,
            &self.core.collector,
        )
        .await
    }

    fn tool_ctx(&self) -> ToolContext {
        ToolContext::new(self.agent.name(), self.agent.directory())
            .with_read_tracker(Arc::clone(&self.core.read_tracker))
            .with_todos(Arc::clone(&self.core.todos))
            .with_scratchpad(Arc::clone(&self.core.scratchpad))
            .with_cancel(self.core.cancel.clone())
            .with_swarm(Arc::clone(&self.core))
    }
}

/// Acquire a permit, aborting if the swarm is cancelled.
async fn acquire(
    semaphore: &Arc<Semaphore>,
    core: &Arc<SwarmCore>,
) -> Result<tokio::sync::OwnedSemaphorePermit> {
    let cancelled = core.cancel.clone();
    tokio::select! {
        _ = cancelled.cancelled() => Err(SwarmError::Cancelled),
        permit = Arc::clone(semaphore).acquire_owned() => {
            permit.map_err(|_| SwarmError::Cancelled)
        }
    }
}

fn error_class(error: &SwarmError) -> &'static str {
    match error {
        SwarmError::Config(_) => "configuration",
        SwarmError::Cycle(_) => "cycle",
        SwarmError::Llm(_) => "llm",
        SwarmError::Tool(_) => "tool",
        SwarmError::PermissionDenied { .. } => "permission",
        SwarmError::State(_) => "state",
        SwarmError::Workflow(_) => "workflow",
        SwarmError::Cancelled => "cancelled",
        SwarmError::Io(_) => "io",
        SwarmError::Json(_) => "json",
        SwarmError::Yaml(_) => "yaml",
    }
}
