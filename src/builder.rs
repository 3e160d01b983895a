//! Builder DSL for AgentSwarm
//!
//! Programmatic swarm construction equivalent to the YAML loader: the same
//! definitions, the same validation (lead resolution, delegation references,
//! cycle detection), the same default observers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::agent::AgentDefinition;
use crate::driver::{LlmDriver, ToolSource};
use crate::error::{Result, SwarmError};
use crate::hooks::{Callback, HookEvent, HookRegistration, HookRegistry, HookResult};
use crate::swarm::{Swarm, DEFAULT_GLOBAL_CONCURRENCY, DEFAULT_LOCAL_CONCURRENCY};

/// Fluent builder for a [`Swarm`].
pub struct SwarmBuilder {
    name: String,
    lead: Option<String>,
    driver: Option<Arc<dyn LlmDriver>>,
    definitions: Vec<AgentDefinition>,
    global_permits: usize,
    local_permits: usize,
    tool_sources: Vec<Arc<dyn ToolSource>>,
    default_hooks: Vec<HookRegistration>,
    agent_hooks: Vec<(String, HookRegistration)>,
}

impl SwarmBuilder {
    /// Create a builder with default capacities.
    pub fn new() -> Self {
        Self {
            name: "swarm".to_string(),
            lead: None,
            driver: None,
            definitions: Vec::new(),
            global_permits: DEFAULT_GLOBAL_CONCURRENCY,
            local_permits: DEFAULT_LOCAL_CONCURRENCY,
            tool_sources: Vec::new(),
            default_hooks: Vec::new(),
            agent_hooks: Vec::new(),
        }
    }

    /// Set the swarm name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the LLM driver.
    pub fn driver(mut self, driver: Arc<dyn LlmDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Add an agent definition.
    pub fn agent(mut self, definition: AgentDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Add several agent definitions.
    pub fn agents(mut self, definitions: impl IntoIterator<Item = AgentDefinition>) -> Self {
        self.definitions.extend(definitions);
        self
    }

    /// Name the lead agent.
    pub fn lead(mut self, lead: impl Into<String>) -> Self {
        self.lead = Some(lead.into());
        self
    }

    /// Set the global semaphore capacity (default 50).
    pub fn global_concurrency(mut self, permits: usize) -> Self {
        self.global_permits = permits;
        self
    }

    /// Set the per-agent semaphore capacity (default 10).
    pub fn local_concurrency(mut self, permits: usize) -> Self {
        self.local_permits = permits;
        self
    }

    /// Register a tool source agents can reference via `mcp_servers`.
    pub fn tool_source(mut self, source: Arc<dyn ToolSource>) -> Self {
        self.tool_sources.push(source);
        self
    }

    /// Add a swarm-default hook registration.
    pub fn hook(mut self, registration: HookRegistration) -> Self {
        self.default_hooks.push(registration);
        self
    }

    /// Add a per-agent hook registration.
    pub fn agent_hook(mut self, agent: impl Into<String>, registration: HookRegistration) -> Self {
        self.agent_hooks.push((agent.into(), registration));
        self
    }

    /// Validate and build the swarm.
    pub fn build(self) -> Result<Swarm> {
        let driver = self
            .driver
            .ok_or_else(|| SwarmError::Config("swarm requires an LLM driver".into()))?;
        if self.definitions.is_empty() {
            return Err(SwarmError::Config("swarm requires at least one agent".into()));
        }

        let mut seen = HashSet::new();
        for def in &self.definitions {
            def.validate()?;
            if !seen.insert(def.name.clone()) {
                return Err(SwarmError::Config(format!(
                    "duplicate agent name '{}'",
                    def.name
                )));
            }
        }

        let lead = self
            .lead
            .ok_or_else(|| SwarmError::Config("swarm requires a lead agent".into()))?;
        if !seen.contains(&lead) {
            return Err(SwarmError::Config(format!(
                "lead agent '{}' is not defined",
                lead
            )));
        }
        for def in &self.definitions {
            for target in &def.delegates_to {
                if !seen.contains(target) {
                    return Err(SwarmError::Config(format!(
                        "agent '{}' delegates to unknown agent '{}'",
                        def.name, target
                    )));
                }
            }
        }
        check_delegation_cycles(&self.definitions)?;

        let default_hooks = HookRegistry::new();
        for registration in self.default_hooks {
            default_hooks.register(registration)?;
        }
        register_default_observers(&default_hooks)?;

        Ok(Swarm::assemble(
            self.name,
            lead,
            driver,
            self.definitions,
            self.global_permits,
            self.local_permits,
            self.tool_sources,
            default_hooks,
            self.agent_hooks,
        ))
    }
}

impl Default for SwarmBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject delegation graphs with cycles (DFS, three colors).
pub(crate) fn check_delegation_cycles(definitions: &[AgentDefinition]) -> Result<()> {
    let adjacency: HashMap<&str, &[String]> = definitions
        .iter()
        .map(|d| (d.name.as_str(), d.delegates_to.as_slice()))
        .collect();

    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    fn visit(
        node: &str,
        adjacency: &HashMap<&str, &[String]>,
        colors: &mut HashMap<String, Color>,
        path: &mut Vec<String>,
    ) -> Result<()> {
        match colors.get(node).copied().unwrap_or(Color::White) {
            Color::Black => return Ok(()),
            Color::Gray => {
                let start = path.iter().position(|p| p == node).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(node.to_string());
                return Err(SwarmError::Cycle(format!(
                    "delegation cycle: {}",
                    cycle.join(" -> ")
                )));
            }
            Color::White => {}
        }
        colors.insert(node.to_string(), Color::Gray);
        path.push(node.to_string());
        if let Some(targets) = adjacency.get(node) {
            for target in targets.iter() {
                visit(target, adjacency, colors, path)?;
            }
        }
        path.pop();
        colors.insert(node.to_string(), Color::Black);
        Ok(())
    }

    let mut colors = HashMap::new();
    let mut path = Vec::new();
    for def in definitions {
        visit(&def.name, &adjacency, &mut colors, &mut path)?;
    }
    Ok(())
}

/// The always-last observers: one per event at priority −100, logging via
/// tracing and never steering.
pub(crate) fn register_default_observers(registry: &HookRegistry) -> Result<()> {
    const EVENTS: [HookEvent; 10] = [
        HookEvent::SwarmStart,
        HookEvent::FirstMessage,
        HookEvent::UserPrompt,
        HookEvent::AgentStop,
        HookEvent::PreToolUse,
        HookEvent::PostToolUse,
        HookEvent::PreDelegation,
        HookEvent::PostDelegation,
        HookEvent::ContextWarning,
        HookEvent::SwarmStop,
    ];
    for event in EVENTS {
        registry.register(
            HookRegistration::new(
                event,
                Callback::sync(|ctx| {
                    debug!(event = %ctx.event, agent = ?ctx.agent, "hook observed");
                    Ok(HookResult::Continue)
                }),
            )
            .with_priority(-100),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ChatReply, ChatRequest, LlmDriver};
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct NullDriver;

    #[async_trait]
    impl LlmDriver for NullDriver {
        fn name(&self) -> &str {
            "null"
        }
        async fn chat(&self, _request: ChatRequest) -> crate::error::Result<ChatReply> {
            Ok(ChatReply::text("ok"))
        }
    }

    fn agent(dir: &std::path::Path, name: &str) -> AgentDefinition {
        AgentDefinition::new(name, format!("{} agent", name), "prompt", dir)
    }

    #[test]
    fn test_build_minimal() {
        let dir = tempdir().unwrap();
        let swarm = Swarm::builder()
            .name("team")
            .driver(Arc::new(NullDriver))
            .agent(agent(dir.path(), "lead"))
            .lead("lead")
            .build()
            .unwrap();
        assert_eq!(swarm.name(), "team");
        assert_eq!(swarm.lead(), "lead");
    }

    #[test]
    fn test_build_requires_driver() {
        let dir = tempdir().unwrap();
        let err = Swarm::builder()
            .agent(agent(dir.path(), "lead"))
            .lead("lead")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("driver"));
    }

    #[test]
    fn test_build_requires_known_lead() {
        let dir = tempdir().unwrap();
        let err = Swarm::builder()
            .driver(Arc::new(NullDriver))
            .agent(agent(dir.path(), "alpha"))
            .lead("missing")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("lead"));
    }

    #[test]
    fn test_build_rejects_duplicate_names() {
        let dir = tempdir().unwrap();
        let err = Swarm::builder()
            .driver(Arc::new(NullDriver))
            .agent(agent(dir.path(), "alpha"))
            .agent(agent(dir.path(), "alpha"))
            .lead("alpha")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_build_rejects_unknown_delegate() {
        let dir = tempdir().unwrap();
        let err = Swarm::builder()
            .driver(Arc::new(NullDriver))
            .agent(agent(dir.path(), "alpha").delegates_to(["ghost"]))
            .lead("alpha")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("unknown agent 'ghost'"));
    }

    #[test]
    fn test_build_rejects_delegation_cycle() {
        let dir = tempdir().unwrap();
        let err = Swarm::builder()
            .driver(Arc::new(NullDriver))
            .agent(agent(dir.path(), "alpha").delegates_to(["beta"]))
            .agent(agent(dir.path(), "beta").delegates_to(["gamma"]))
            .agent(agent(dir.path(), "gamma").delegates_to(["alpha"]))
            .lead("alpha")
            .build()
            .unwrap_err();
        assert!(matches!(err, SwarmError::Cycle(_)));
        assert!(err.to_string().contains("alpha"));
    }

    #[test]
    fn test_self_delegation_is_a_cycle() {
        let dir = tempdir().unwrap();
        let err = Swarm::builder()
            .driver(Arc::new(NullDriver))
            .agent(agent(dir.path(), "alpha").delegates_to(["alpha"]))
            .lead("alpha")
            .build()
            .unwrap_err();
        assert!(matches!(err, SwarmError::Cycle(_)));
    }

    #[test]
    fn test_diamond_delegation_is_not_a_cycle() {
        let dir = tempdir().unwrap();
        let swarm = Swarm::builder()
            .driver(Arc::new(NullDriver))
            .agent(agent(dir.path(), "alpha").delegates_to(["beta", "gamma"]))
            .agent(agent(dir.path(), "beta").delegates_to(["delta"]))
            .agent(agent(dir.path(), "gamma").delegates_to(["delta"]))
            .agent(agent(dir.path(), "delta"))
            .lead("alpha")
            .build();
        assert!(swarm.is_ok());
    }

    #[test]
    fn test_default_observers_registered() {
        let registry = HookRegistry::new();
        register_default_observers(&registry).unwrap();
        assert_eq!(registry.len(), 10);
        let observers = registry.matching(HookEvent::PreToolUse, Some("anything"));
        assert_eq!(observers.len(), 1);
        assert_eq!(observers[0].priority, -100);
    }
}
