//! Swarm orchestration for AgentSwarm
//!
//! A [`Swarm`] owns its agents, the two-level rate limiter, the shared
//! scratchpad and state stores, the hook registries, and the log event
//! collector. [`Swarm::execute`] runs the lead agent against a prompt and
//! returns an [`ExecutionResult`] with aggregated accounting; lead driver
//! failures are captured into the result rather than raised.
//!
//! Agents are initialized lazily on the first execute call in five passes:
//! tool sets (defaults, tool sources, permission wrapping), delegation
//! tools, per-agent context state, per-agent hook registries, and declared
//! hook attachments. Hook registries and the subscriber list freeze when
//! execution starts.

mod result;

pub use result::ExecutionResult;
pub(crate) use result::aggregate;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::{Agent, AgentDefinition, AgentRunner};
use crate::driver::{LlmDriver, ToolSource};
use crate::error::{Result, SwarmError};
use crate::events::{now, EventCollector, ExecutionStatus, LogEvent, Subscriber};
use crate::hooks::{dispatch, HookContext, HookEvent, HookRegistration, HookRegistry, HookResult};
use crate::state::{ReadTracker, Scratchpad, TodoStore};
use crate::tools::{default_tools, DelegationTool, PermissionedTool, Tool, ToolRegistry};

/// Default global semaphore capacity.
pub const DEFAULT_GLOBAL_CONCURRENCY: usize = 50;
/// Default per-agent semaphore capacity.
pub const DEFAULT_LOCAL_CONCURRENCY: usize = 10;

/// Shared innards of a swarm, behind one `Arc` so runners, tools and node
/// orchestration can reference it without ownership cycles.
pub(crate) struct SwarmCore {
    pub(crate) name: String,
    pub(crate) lead: String,
    pub(crate) driver: Arc<dyn LlmDriver>,
    pub(crate) definitions: Vec<AgentDefinition>,
    pub(crate) global_semaphore: Arc<Semaphore>,
    pub(crate) default_local_permits: usize,
    pub(crate) scratchpad: Arc<Scratchpad>,
    pub(crate) read_tracker: Arc<ReadTracker>,
    pub(crate) todos: Arc<TodoStore>,
    pub(crate) default_hooks: HookRegistry,
    pub(crate) collector: EventCollector,
    pub(crate) cancel: CancellationToken,
    pub(crate) tool_sources: Vec<Arc<dyn ToolSource>>,
    pub(crate) agent_hook_seed: std::sync::Mutex<Vec<(String, HookRegistration)>>,
    pub(crate) agents: tokio::sync::OnceCell<HashMap<String, Arc<Agent>>>,
}

impl SwarmCore {
    /// Look up an initialized agent by name.
    pub(crate) fn agent(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents.get().and_then(|map| map.get(name)).cloned()
    }

    /// Five-pass lazy agent initialization. Idempotent.
    pub(crate) async fn init(self: &Arc<Self>) -> Result<()> {
        self.agents
            .get_or_try_init(|| async {
                // Pass 1: per-agent tool sets (defaults, sources, permissions).
                let mut tool_sets: HashMap<String, ToolRegistry> = HashMap::new();
                for def in &self.definitions {
                    let mut registry = ToolRegistry::new();
                    if def.include_default_tools {
                        for tool in default_tools() {
                            registry.register(tool);
                        }
                    }
                    for source_ref in &def.mcp_servers {
                        let source = self
                            .tool_sources
                            .iter()
                            .find(|s| s.name() == source_ref.name)
                            .ok_or_else(|| {
                                SwarmError::Config(format!(
                                    "agent '{}' references unknown tool source '{}'",
                                    def.name, source_ref.name
                                ))
                            })?;
                        for tool in source.discover().await? {
                            registry.register(tool);
                        }
                    }
                    for spec in &def.tools {
                        let base: Arc<dyn Tool> = match registry.get(&spec.name) {
                            Some(tool) => tool,
                            None => default_tools()
                                .into_iter()
                                .find(|t| t.name() == spec.name)
                                .ok_or_else(|| {
                                    SwarmError::Config(format!(
                                        "agent '{}' references unknown tool '{}'",
                                        def.name, spec.name
                                    ))
                                })?,
                        };
                        let tool: Arc<dyn Tool> = match &spec.permissions {
                            Some(perms) if !def.bypass_permissions => {
                                Arc::new(PermissionedTool::new(base, perms)?)
                            }
                            _ => base,
                        };
                        registry.register(tool);
                    }
                    tool_sets.insert(def.name.clone(), registry);
                }

                if let Some(known) = self.driver.known_models() {
                    for def in &self.definitions {
                        if !known.iter().any(|m| m == &def.model) {
                            self.collector.emit(LogEvent::ModelLookupWarning {
                                timestamp: now(),
                                agent: def.name.clone(),
                                model: def.model.clone(),
                                error_message: format!(
                                    "model '{}' is not known to driver '{}'",
                                    def.model,
                                    self.driver.name()
                                ),
                                suggestions: crate::config::closest_matches(&def.model, &known),
                            });
                        }
                    }
                }

                // Pass 2: delegation tools, named after their targets.
                let by_name: HashMap<&str, &AgentDefinition> = self
                    .definitions
                    .iter()
                    .map(|d| (d.name.as_str(), d))
                    .collect();
                for def in &self.definitions {
                    let registry = tool_sets.get_mut(&def.name).expect("tool set");
                    for target in &def.delegates_to {
                        let target_def = by_name.get(target.as_str()).ok_or_else(|| {
                            SwarmError::Config(format!(
                                "agent '{}' delegates to unknown agent '{}'",
                                def.name, target
                            ))
                        })?;
                        registry.register(Arc::new(DelegationTool::new(
                            target,
                            &target_def.description,
                        )));
                    }
                }

                // Passes 3 and 4: runtime agents with context state and fresh
                // hook registries.
                let mut agents = HashMap::new();
                for def in &self.definitions {
                    let registry = tool_sets.remove(&def.name).expect("tool set");
                    let agent = Agent::new(def.clone(), registry, self.default_local_permits)?;
                    agents.insert(def.name.clone(), Arc::new(agent));
                }

                // Pass 5: declared per-agent hooks.
                let seeded: Vec<(String, HookRegistration)> = self
                    .agent_hook_seed
                    .lock()
                    .expect("hook seed lock")
                    .drain(..)
                    .collect();
                for (agent_name, registration) in seeded {
                    let agent = agents.get(&agent_name).ok_or_else(|| {
                        SwarmError::Config(format!(
                            "hook declared for unknown agent '{}'",
                            agent_name
                        ))
                    })?;
                    agent.hooks.register(registration)?;
                }

                info!(swarm = %self.name, agents = agents.len(), "Swarm agents initialized");
                Ok(agents)
            })
            .await
            .map(|_| ())
    }
}

/// A set of agents with one lead, sharing a scheduler, rate limits and
/// scratchpad.
pub struct Swarm {
    core: Arc<SwarmCore>,
}

impl std::fmt::Debug for Swarm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swarm")
            .field("name", &self.core.name)
            .field("lead", &self.core.lead)
            .finish_non_exhaustive()
    }
}

impl Swarm {
    /// Start building a swarm.
    pub fn builder() -> crate::builder::SwarmBuilder {
        crate::builder::SwarmBuilder::new()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        name: String,
        lead: String,
        driver: Arc<dyn LlmDriver>,
        definitions: Vec<AgentDefinition>,
        global_permits: usize,
        local_permits: usize,
        tool_sources: Vec<Arc<dyn ToolSource>>,
        default_hooks: HookRegistry,
        agent_hooks: Vec<(String, HookRegistration)>,
    ) -> Self {
        Self {
            core: Arc::new(SwarmCore {
                name,
                lead,
                driver,
                definitions,
                global_semaphore: Arc::new(Semaphore::new(global_permits.max(1))),
                default_local_permits: local_permits.max(1),
                scratchpad: Arc::new(Scratchpad::new()),
                read_tracker: Arc::new(ReadTracker::new()),
                todos: Arc::new(TodoStore::new()),
                default_hooks,
                collector: EventCollector::new(),
                cancel: CancellationToken::new(),
                tool_sources,
                agent_hook_seed: std::sync::Mutex::new(agent_hooks),
                agents: tokio::sync::OnceCell::new(),
            }),
        }
    }

    /// The swarm name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// The lead agent's name.
    pub fn lead(&self) -> &str {
        &self.core.lead
    }

    /// The shared scratchpad.
    pub fn scratchpad(&self) -> &Arc<Scratchpad> {
        &self.core.scratchpad
    }

    /// The swarm-default hook registry. Register here before calling execute.
    pub fn hooks(&self) -> &HookRegistry {
        &self.core.default_hooks
    }

    /// Queue a hook registration for one agent. Before initialization the
    /// registration is held and attached in pass 5; afterwards it goes to the
    /// agent's registry directly (and fails once frozen).
    pub fn register_agent_hook(&self, agent: &str, registration: HookRegistration) -> Result<()> {
        if let Some(existing) = self.core.agent(agent) {
            return existing.hooks.register(registration);
        }
        self.core
            .agent_hook_seed
            .lock()
            .expect("hook seed lock")
            .push((agent.to_string(), registration));
        Ok(())
    }

    /// Register a log subscriber. Fails once execution has started.
    pub fn subscribe(&self, subscriber: Subscriber) -> Result<()> {
        self.core.collector.subscribe(subscriber)
    }

    /// A cancellation handle for this swarm. Cancelling aborts in-flight work
    /// at the next suspension point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.core.cancel.clone()
    }

    /// Look up an initialized agent.
    pub fn agent(&self, name: &str) -> Option<Arc<Agent>> {
        self.core.agent(name)
    }

    /// Execute the swarm against a prompt.
    pub async fn execute(&self, prompt: &str) -> ExecutionResult {
        self.execute_inner(prompt, None).await
    }

    /// Execute with a log subscriber registered for this run.
    pub async fn execute_with_subscriber(
        &self,
        prompt: &str,
        subscriber: Subscriber,
    ) -> ExecutionResult {
        self.execute_inner(prompt, Some(subscriber)).await
    }

    async fn execute_inner(&self, prompt: &str, subscriber: Option<Subscriber>) -> ExecutionResult {
        let started = Instant::now();
        let core = &self.core;

        if let Some(subscriber) = subscriber {
            if let Err(e) = core.collector.subscribe(subscriber) {
                return self.failure_result(e.to_string(), ExecutionStatus::Error, started);
            }
        }
        core.collector.freeze();

        if let Err(e) = core.init().await {
            warn!(swarm = %core.name, error = %e, "Swarm initialization failed");
            return self.failure_result(e.to_string(), ExecutionStatus::Error, started);
        }
        core.default_hooks.freeze();
        if let Some(agents) = core.agents.get() {
            for agent in agents.values() {
                agent.hooks.freeze();
            }
        }

        let lead = core
            .agent(&core.lead)
            .expect("lead agent resolved at build time");

        // swarm_start may halt the whole execution.
        let mut start_ctx = HookContext::new(HookEvent::SwarmStart, &core.name)
            .with_agent(lead.name())
            .with_prompt(prompt)
            .with_project_dir(lead.directory());
        if let HookResult::Halt(text) =
            dispatch(&[&core.default_hooks], &mut start_ctx, &core.collector).await
        {
            let result = self.failure_result(text, ExecutionStatus::Error, started);
            self.emit_stop(&result);
            return self.finalize(result).await;
        }

        core.collector.emit(LogEvent::SwarmStart {
            timestamp: now(),
            swarm_name: core.name.clone(),
            lead_agent: core.lead.clone(),
            prompt: prompt.to_string(),
        });

        let mut current_prompt = prompt.to_string();
        let mut content = String::new();
        let mut error: Option<SwarmError> = None;

        loop {
            let runner = AgentRunner::new(Arc::clone(core), Arc::clone(&lead));
            match runner.ask(&current_prompt).await {
                Ok(message) => {
                    content = message.content;
                    error = None;
                }
                Err(e) => {
                    warn!(swarm = %core.name, error = %e, "Lead agent failed");
                    error = Some(e);
                }
            }

            // swarm_stop fires on success and error; Reprompt restarts the
            // lead with preserved history and counters.
            let mut stop_ctx = HookContext::new(HookEvent::SwarmStop, &core.name)
                .with_agent(lead.name())
                .with_prompt(&current_prompt)
                .with_project_dir(lead.directory());
            if !content.is_empty() {
                stop_ctx
                    .metadata
                    .insert("content".into(), serde_json::json!(content));
            }
            match dispatch(&[&core.default_hooks], &mut stop_ctx, &core.collector).await {
                HookResult::Reprompt(new_prompt) => {
                    info!(swarm = %core.name, "swarm_stop requested a reprompt");
                    current_prompt = new_prompt;
                    continue;
                }
                _ => break,
            }
        }

        let status = match &error {
            None if core.cancel.is_cancelled() => ExecutionStatus::Cancelled,
            None => ExecutionStatus::Success,
            Some(SwarmError::Cancelled) => ExecutionStatus::Cancelled,
            Some(_) => ExecutionStatus::Error,
        };

        let result = ExecutionResult {
            content,
            agent: core.lead.clone(),
            success: status == ExecutionStatus::Success,
            status,
            error: error.map(|e| e.to_string()),
            logs: Vec::new(),
            total_cost: 0.0,
            total_tokens: 0,
            llm_requests: 0,
            tool_calls_count: 0,
            agents_involved: Vec::new(),
            duration: started.elapsed(),
        };
        self.emit_stop(&result);
        self.finalize(result).await
    }

    /// Emit the terminal swarm_stop event with aggregates so far.
    fn emit_stop(&self, result: &ExecutionResult) {
        let totals = aggregate(&self.core.collector.snapshot());
        self.core.collector.emit(LogEvent::SwarmStop {
            timestamp: now(),
            status: result.status,
            duration: result.duration.as_secs_f64(),
            total_cost: totals.total_cost,
            total_tokens: totals.total_tokens,
            llm_requests: totals.llm_requests,
            tool_calls: totals.tool_calls,
            agents_involved: totals.agents_involved,
        });
    }

    /// Shut down tool sources and fill the result with the final log view.
    async fn finalize(&self, mut result: ExecutionResult) -> ExecutionResult {
        for source in &self.core.tool_sources {
            if let Err(e) = source.shutdown().await {
                warn!(source = source.name(), error = %e, "Tool source shutdown failed");
            }
        }
        let logs = self.core.collector.snapshot();
        let totals = aggregate(&logs);
        result.total_cost = totals.total_cost;
        result.total_tokens = totals.total_tokens;
        result.llm_requests = totals.llm_requests;
        result.tool_calls_count = totals.tool_calls;
        result.agents_involved = totals.agents_involved;
        result.logs = logs;
        result
    }

    fn failure_result(
        &self,
        error: String,
        status: ExecutionStatus,
        started: Instant,
    ) -> ExecutionResult {
        ExecutionResult {
            content: String::new(),
            agent: self.core.lead.clone(),
            success: false,
            status,
            error: Some(error),
            logs: self.core.collector.snapshot(),
            total_cost: 0.0,
            total_tokens: 0,
            llm_requests: 0,
            tool_calls_count: 0,
            agents_involved: Vec::new(),
            duration: started.elapsed(),
        }
    }
}
