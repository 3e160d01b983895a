//! Node workflows for AgentSwarm
//!
//! A node workflow chains independent swarm executions as a DAG: each node
//! declares a subset of the agent pool, optional input/output transformers,
//! and dependencies on other nodes. [`NodeGraph`] validates the shape
//! (unique names, resolvable dependencies, acyclicity, a start node without
//! dependencies); [`NodeOrchestrator`] executes nodes in topological order,
//! instantiating a disposable sub-swarm per node.

mod orchestrator;
mod transformer;

pub use orchestrator::{NodeOrchestrator, WorkflowResult};
pub use transformer::{
    BlockTransformer, Transformer, TransformerContext, TransformerOutcome,
    TRANSFORMER_TIMEOUT_SECS,
};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwarmError};

/// The outcome of one workflow node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    /// The node's final content
    pub content: String,
    /// The sub-swarm lead that produced it (empty for agent-less nodes)
    pub agent: String,
    /// Whether the node completed successfully
    pub success: bool,
    /// Wall-clock seconds the node took
    pub duration: f64,
    /// Total tokens used by the node's sub-swarm
    pub total_tokens: u64,
    /// Total cost of the node's sub-swarm
    pub total_cost: f64,
}

/// One stage in a workflow.
#[derive(Clone, Debug)]
pub struct NodeDefinition {
    /// Node name, unique within the graph
    pub name: String,
    /// Agents (by name) instantiated for this node's sub-swarm
    pub agents: Vec<String>,
    /// Sub-swarm lead; defaults to the first declared agent
    pub lead: Option<String>,
    /// Nodes that must finish before this one starts
    pub depends_on: Vec<String>,
    /// Optional rewrite of the node's input
    pub input_transformer: Option<Transformer>,
    /// Optional rewrite of the node's output
    pub output_transformer: Option<Transformer>,
}

impl NodeDefinition {
    /// Create a node with no agents, dependencies or transformers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agents: Vec::new(),
            lead: None,
            depends_on: Vec::new(),
            input_transformer: None,
            output_transformer: None,
        }
    }

    /// Declare the node's agents.
    pub fn agents(mut self, agents: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.agents.extend(agents.into_iter().map(Into::into));
        self
    }

    /// Name the sub-swarm lead explicitly.
    pub fn lead(mut self, lead: impl Into<String>) -> Self {
        self.lead = Some(lead.into());
        self
    }

    /// Declare dependencies.
    pub fn depends_on(mut self, nodes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on.extend(nodes.into_iter().map(Into::into));
        self
    }

    /// Attach an input transformer.
    pub fn input_transformer(mut self, transformer: Transformer) -> Self {
        self.input_transformer = Some(transformer);
        self
    }

    /// Attach an output transformer.
    pub fn output_transformer(mut self, transformer: Transformer) -> Self {
        self.output_transformer = Some(transformer);
        self
    }

    /// Whether this node runs without a sub-swarm.
    pub fn is_agent_less(&self) -> bool {
        self.agents.is_empty()
    }

    /// The effective lead name, when the node has agents.
    pub fn effective_lead(&self) -> Option<&str> {
        self.lead
            .as_deref()
            .or_else(|| self.agents.first().map(|s| s.as_str()))
    }
}

/// A validated DAG of workflow nodes.
#[derive(Debug)]
pub struct NodeGraph {
    nodes: Vec<NodeDefinition>,
    order: Vec<usize>,
    start: String,
    terminal: String,
}

impl NodeGraph {
    /// Validate the node set and compute the topological order.
    pub fn new(nodes: Vec<NodeDefinition>, start: impl Into<String>) -> Result<Self> {
        let start = start.into();
        if nodes.is_empty() {
            return Err(SwarmError::Config("workflow requires at least one node".into()));
        }

        let mut names = HashSet::new();
        for node in &nodes {
            if !names.insert(node.name.clone()) {
                return Err(SwarmError::Config(format!(
                    "duplicate node name '{}'",
                    node.name
                )));
            }
            if node.is_agent_less()
                && node.input_transformer.is_none()
                && node.output_transformer.is_none()
            {
                return Err(SwarmError::Config(format!(
                    "agent-less node '{}' needs at least one transformer",
                    node.name
                )));
            }
        }
        for node in &nodes {
            for dep in &node.depends_on {
                if !names.contains(dep) {
                    return Err(SwarmError::Config(format!(
                        "node '{}' depends on unknown node '{}'",
                        node.name, dep
                    )));
                }
            }
        }

        let start_node = nodes
            .iter()
            .find(|n| n.name == start)
            .ok_or_else(|| SwarmError::Config(format!("start node '{}' is not defined", start)))?;
        if !start_node.depends_on.is_empty() {
            return Err(SwarmError::Config(format!(
                "start node '{}' must not have dependencies",
                start
            )));
        }

        let order = topological_order(&nodes)?;

        // The workflow output is the terminal node's result, so exactly one
        // node may be a sink (no dependents). With the graph acyclic, at
        // least one sink always exists.
        let mut has_dependents: HashSet<&str> = HashSet::new();
        for node in &nodes {
            for dep in &node.depends_on {
                has_dependents.insert(dep.as_str());
            }
        }
        let sinks: Vec<&str> = order
            .iter()
            .map(|&i| nodes[i].name.as_str())
            .filter(|name| !has_dependents.contains(name))
            .collect();
        if sinks.len() != 1 {
            return Err(SwarmError::Config(format!(
                "workflow must have exactly one terminal node, found {}: {}",
                sinks.len(),
                sinks.join(", ")
            )));
        }
        let terminal = sinks[0].to_string();

        Ok(Self {
            nodes,
            order,
            start,
            terminal,
        })
    }

    /// The start node's name.
    pub fn start(&self) -> &str {
        &self.start
    }

    /// The terminal node's name: the unique sink whose result is the
    /// workflow output.
    pub fn terminal(&self) -> &str {
        &self.terminal
    }

    /// Nodes in topological order.
    pub fn topological(&self) -> impl Iterator<Item = &NodeDefinition> {
        self.order.iter().map(|&i| &self.nodes[i])
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty (never true for a constructed graph).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Kahn's algorithm; declaration order breaks ties so execution is stable.
fn topological_order(nodes: &[NodeDefinition]) -> Result<Vec<usize>> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.name.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for dep in &node.depends_on {
            let d = index[dep.as_str()];
            in_degree[i] += 1;
            dependents[d].push(i);
        }
    }

    let mut ready: Vec<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(&next) = ready.first() {
        ready.remove(0);
        order.push(next);
        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(dependent);
                ready.sort_unstable();
            }
        }
    }

    if order.len() != nodes.len() {
        let stuck: Vec<&str> = (0..nodes.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| nodes[i].name.as_str())
            .collect();
        return Err(SwarmError::Cycle(format!(
            "node dependency cycle involving: {}",
            stuck.join(", ")
        )));
    }
    Ok(order)
}
