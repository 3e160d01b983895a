//! Raw configuration types for the YAML v2 document.
//!
//! These mirror the document shape one-to-one; unknown-key rejection happens
//! in [`super::validate`] before typed deserialization, so these types stay
//! permissive. Conversion to validated [`crate::AgentDefinition`]s lives in
//! the loader.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use serde_json::Value;

use crate::tools::ToolPermissions;

/// The whole configuration document.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDocument {
    pub version: u32,
    pub swarm: RawSwarm,
}

/// The `swarm` section.
#[derive(Debug, Deserialize)]
pub(crate) struct RawSwarm {
    pub name: String,
    pub lead: String,
    #[serde(default)]
    pub all_agents: Option<RawAgent>,
    #[serde(default)]
    pub agents: BTreeMap<String, RawAgent>,
    #[serde(default)]
    pub hooks: Option<RawHooks>,
    #[serde(default)]
    pub global_concurrency: Option<usize>,
    #[serde(default)]
    pub local_concurrency: Option<usize>,
}

/// One agent entry (also the shape of `all_agents`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawAgent {
    pub description: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub api_version: Option<String>,
    pub context_window: Option<u64>,
    pub system_prompt: Option<String>,
    pub directory: Option<String>,
    pub tools: Vec<RawToolEntry>,
    pub delegates_to: Vec<String>,
    pub include_default_tools: Option<bool>,
    pub bypass_permissions: Option<bool>,
    /// LLM request timeout in seconds
    pub timeout: Option<u64>,
    pub parameters: serde_json::Map<String, Value>,
    pub headers: HashMap<String, String>,
    pub mcp_servers: Vec<RawSourceRef>,
}

/// A tool entry: a bare name or `{name, permissions}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawToolEntry {
    Name(String),
    Spec {
        name: String,
        #[serde(default)]
        permissions: Option<ToolPermissions>,
    },
}

impl RawToolEntry {
    /// The tool name regardless of shape.
    pub fn name(&self) -> &str {
        match self {
            RawToolEntry::Name(name) => name,
            RawToolEntry::Spec { name, .. } => name,
        }
    }
}

/// A tool source reference with opaque settings.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSourceRef {
    pub name: String,
    #[serde(flatten)]
    pub settings: serde_json::Map<String, Value>,
}

/// Swarm-level hooks (only swarm_start / swarm_stop are supported here).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawHooks {
    pub swarm_start: Vec<RawHook>,
    pub swarm_stop: Vec<RawHook>,
}

/// One declared shell hook.
#[derive(Debug, Deserialize)]
pub(crate) struct RawHook {
    pub command: String,
    /// Timeout in seconds (default 60)
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub priority: Option<i32>,
}
