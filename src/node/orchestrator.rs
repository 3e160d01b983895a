//! Workflow execution for AgentSwarm
//!
//! [`NodeOrchestrator`] runs a validated [`NodeGraph`] against a prompt:
//! nodes execute in topological order, each in a fresh disposable sub-swarm
//! built from the node's agent subset (delegation restricted to that subset,
//! referenced-but-undeclared delegates auto-added without onward
//! delegation). Sub-swarm events are forwarded into the orchestrator's own
//! collector alongside `node_start`/`node_stop` events.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::agent::AgentDefinition;
use crate::driver::LlmDriver;
use crate::error::{Result, SwarmError};
use crate::events::{now, EventCollector, LogEvent, Subscriber};
use crate::swarm::Swarm;

use super::{NodeDefinition, NodeGraph, NodeResult, TransformerContext, TransformerOutcome};

/// The outcome of one workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    /// The terminal node's result
    pub output: NodeResult,
    /// Every node's result by name
    pub results: HashMap<String, NodeResult>,
    /// Events emitted during the run (node events plus forwarded sub-swarm
    /// events)
    pub logs: Vec<LogEvent>,
}

/// Executes a node graph over a pool of agent definitions.
pub struct NodeOrchestrator {
    graph: NodeGraph,
    pool: HashMap<String, AgentDefinition>,
    driver: Arc<dyn LlmDriver>,
    collector: Arc<EventCollector>,
}

impl NodeOrchestrator {
    /// Create an orchestrator, checking every node's agents and lead resolve
    /// in the pool.
    pub fn new(
        graph: NodeGraph,
        pool: impl IntoIterator<Item = AgentDefinition>,
        driver: Arc<dyn LlmDriver>,
    ) -> Result<Self> {
        let pool: HashMap<String, AgentDefinition> =
            pool.into_iter().map(|d| (d.name.clone(), d)).collect();

        for node in graph.topological() {
            for agent in &node.agents {
                if !pool.contains_key(agent) {
                    return Err(SwarmError::Config(format!(
                        "node '{}' references unknown agent '{}'",
                        node.name, agent
                    )));
                }
            }
            if let Some(lead) = &node.lead {
                if !node.agents.contains(lead) {
                    return Err(SwarmError::Config(format!(
                        "node '{}' lead '{}' is not among its agents",
                        node.name, lead
                    )));
                }
            }
        }

        Ok(Self {
            graph,
            pool,
            driver,
            collector: Arc::new(EventCollector::new()),
        })
    }

    /// Register a log subscriber. Fails once a run has started.
    pub fn subscribe(&self, subscriber: Subscriber) -> Result<()> {
        self.collector.subscribe(subscriber)
    }

    /// Run the workflow. The output is the terminal node's result, which the
    /// graph guarantees is the unique sink.
    pub async fn run(&self, prompt: &str) -> Result<WorkflowResult> {
        self.collector.freeze();
        let mut results: HashMap<String, NodeResult> = HashMap::new();

        for node in self.graph.topological() {
            let started = Instant::now();
            self.collector.emit(LogEvent::NodeStart {
                timestamp: now(),
                node: node.name.clone(),
                agent_less: node.is_agent_less(),
                agents: node.agents.clone(),
                dependencies: node.depends_on.clone(),
            });

            // Input: the dependency outputs in declaration order, or the
            // original prompt for roots.
            let content = if node.depends_on.is_empty() {
                prompt.to_string()
            } else {
                node.depends_on
                    .iter()
                    .filter_map(|dep| results.get(dep))
                    .map(|r| r.content.clone())
                    .collect::<Vec<_>>()
                    .join("\n\n")
            };

            let project_dir = self.node_project_dir(node);
            let ctx = TransformerContext {
                node: node.name.clone(),
                content,
                original_prompt: prompt.to_string(),
                dependencies: node.depends_on.clone(),
                all_results: results.clone(),
                project_dir: project_dir.clone(),
            };

            let mut content = ctx.content.clone();
            let mut skipped = false;
            if let Some(transformer) = &node.input_transformer {
                match transformer.apply(&ctx).await? {
                    TransformerOutcome::Content(new_content) => content = new_content,
                    TransformerOutcome::Skip { content: cached } => {
                        info!(node = %node.name, "Input transformer skipped node execution");
                        skipped = true;
                        content = cached;
                    }
                    TransformerOutcome::Halt(message) => {
                        warn!(node = %node.name, "Input transformer halted the workflow");
                        return Err(SwarmError::Workflow(message));
                    }
                }
            }

            let mut result = if skipped || node.is_agent_less() {
                NodeResult {
                    content,
                    agent: String::new(),
                    success: true,
                    duration: started.elapsed().as_secs_f64(),
                    total_tokens: 0,
                    total_cost: 0.0,
                }
            } else {
                self.run_node_swarm(node, &content).await?
            };

            if let Some(transformer) = &node.output_transformer {
                let ctx = TransformerContext {
                    node: node.name.clone(),
                    content: result.content.clone(),
                    original_prompt: prompt.to_string(),
                    dependencies: node.depends_on.clone(),
                    all_results: results.clone(),
                    project_dir,
                };
                match transformer.apply(&ctx).await? {
                    TransformerOutcome::Content(new_content)
                    | TransformerOutcome::Skip {
                        content: new_content,
                    } => result.content = new_content,
                    TransformerOutcome::Halt(message) => {
                        warn!(node = %node.name, "Output transformer halted the workflow");
                        return Err(SwarmError::Workflow(message));
                    }
                }
            }

            self.collector.emit(LogEvent::NodeStop {
                timestamp: now(),
                node: node.name.clone(),
                agent_less: node.is_agent_less(),
                skipped,
                agents: node.agents.clone(),
                duration: started.elapsed().as_secs_f64(),
            });

            results.insert(node.name.clone(), result);
        }

        let output = results
            .get(self.graph.terminal())
            .cloned()
            .ok_or_else(|| SwarmError::Workflow("workflow produced no output".into()))?;
        Ok(WorkflowResult {
            output,
            results,
            logs: self.collector.snapshot(),
        })
    }

    /// The directory exported to the node's shell transformers: the lead
    /// agent's directory, when the node has agents.
    fn node_project_dir(&self, node: &NodeDefinition) -> Option<std::path::PathBuf> {
        node.effective_lead()
            .and_then(|lead| self.pool.get(lead))
            .map(|def| def.directory.clone())
    }

    /// Build and execute one node's disposable sub-swarm.
    async fn run_node_swarm(&self, node: &NodeDefinition, content: &str) -> Result<NodeResult> {
        let definitions = self.node_definitions(node);
        let lead = node
            .effective_lead()
            .expect("nodes with agents have a lead")
            .to_string();

        let swarm = Swarm::builder()
            .name(format!("node:{}", node.name))
            .driver(Arc::clone(&self.driver))
            .agents(definitions)
            .lead(lead)
            .build()?;

        let forward = Arc::clone(&self.collector);
        let execution = swarm
            .execute_with_subscriber(
                content,
                Arc::new(move |event: &LogEvent| forward.emit(event.clone())),
            )
            .await;

        if !execution.success {
            return Err(SwarmError::Workflow(format!(
                "node '{}' failed: {}",
                node.name,
                execution.error.as_deref().unwrap_or("unknown error")
            )));
        }

        Ok(NodeResult {
            content: execution.content,
            agent: execution.agent,
            success: true,
            duration: execution.duration.as_secs_f64(),
            total_tokens: execution.total_tokens,
            total_cost: execution.total_cost,
        })
    }

    /// The node's agent subset: declared agents keep their delegation
    /// restricted to the subset closure; referenced-but-undeclared delegates
    /// are auto-added with no onward delegation.
    fn node_definitions(&self, node: &NodeDefinition) -> Vec<AgentDefinition> {
        let declared: HashSet<&str> = node.agents.iter().map(|s| s.as_str()).collect();
        let mut definitions = Vec::new();
        let mut auto_added: Vec<String> = Vec::new();

        for name in &node.agents {
            let def = self.pool[name].clone();
            for target in &def.delegates_to {
                if !declared.contains(target.as_str()) && !auto_added.contains(target) {
                    auto_added.push(target.clone());
                }
            }
            definitions.push(def);
        }
        for name in auto_added {
            if let Some(def) = self.pool.get(&name) {
                let mut def = def.clone();
                def.delegates_to.clear();
                definitions.push(def);
            }
        }
        definitions
    }
}
