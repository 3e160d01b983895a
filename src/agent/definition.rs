//! Agent definitions for AgentSwarm
//!
//! An [`AgentDefinition`] is the validated, immutable description of one
//! agent: identity, provider routing, system prompt, working directory, tool
//! selection with optional per-tool permissions, and delegation targets.
//! Both the YAML loader and the builder DSL produce these.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SwarmError};
use crate::tools::ToolPermissions;

/// Default context window when a definition does not set one.
pub const DEFAULT_CONTEXT_WINDOW: u64 = 200_000;
/// Default per-agent LLM request timeout in seconds.
pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 300;
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
/// Default provider identifier.
pub const DEFAULT_PROVIDER: &str = "anthropic";

/// One entry in an agent's tool list: a tool name with optional permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// The tool name
    pub name: String,
    /// Optional allow/deny path rules for this tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<ToolPermissions>,
}

impl ToolSpec {
    /// A plain tool reference with no permissions.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: None,
        }
    }

    /// A tool reference with permissions.
    pub fn with_permissions(name: impl Into<String>, permissions: ToolPermissions) -> Self {
        Self {
            name: name.into(),
            permissions: Some(permissions),
        }
    }
}

/// Reference to a registered tool source (MCP server descriptor).
///
/// The core only needs the name to find the registered [`crate::ToolSource`];
/// everything else is opaque transport configuration the source itself
/// interprets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSourceRef {
    /// Name of the registered source
    pub name: String,
    /// Opaque source settings
    #[serde(flatten)]
    pub settings: serde_json::Map<String, Value>,
}

/// Validated description of one agent.
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    /// Agent name, unique within the swarm
    pub name: String,
    /// Required human-readable description (shown to delegating agents)
    pub description: String,
    /// Model identifier
    pub model: String,
    /// Provider identifier
    pub provider: String,
    /// Optional base URL override
    pub base_url: Option<String>,
    /// Optional API version override
    pub api_version: Option<String>,
    /// Context window size in tokens
    pub context_window: u64,
    /// Required system prompt
    pub system_prompt: String,
    /// Working directory; must exist
    pub directory: PathBuf,
    /// Tool selection with optional per-tool permissions
    pub tools: Vec<ToolSpec>,
    /// Names of agents this agent may delegate to
    pub delegates_to: Vec<String>,
    /// Whether the built-in tool set is included (default true)
    pub include_default_tools: bool,
    /// Whether permission wrapping is disabled for this agent
    pub bypass_permissions: bool,
    /// LLM request timeout
    pub timeout: Duration,
    /// Provider-opaque request parameters
    pub parameters: serde_json::Map<String, Value>,
    /// Extra HTTP headers
    pub headers: HashMap<String, String>,
    /// Tool source references
    pub mcp_servers: Vec<ToolSourceRef>,
}

impl AgentDefinition {
    /// Create a definition with defaults for everything not passed.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
        directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            model: DEFAULT_MODEL.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            base_url: None,
            api_version: None,
            context_window: DEFAULT_CONTEXT_WINDOW,
            system_prompt: system_prompt.into(),
            directory: directory.into(),
            tools: Vec::new(),
            delegates_to: Vec::new(),
            include_default_tools: true,
            bypass_permissions: false,
            timeout: Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS),
            parameters: serde_json::Map::new(),
            headers: HashMap::new(),
            mcp_servers: Vec::new(),
        }
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Set the context window.
    pub fn with_context_window(mut self, tokens: u64) -> Self {
        self.context_window = tokens;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a tool by name.
    pub fn with_tool(mut self, name: impl Into<String>) -> Self {
        self.tools.push(ToolSpec::named(name));
        self
    }

    /// Add a tool with permissions.
    pub fn with_tool_permissions(
        mut self,
        name: impl Into<String>,
        permissions: ToolPermissions,
    ) -> Self {
        self.tools.push(ToolSpec::with_permissions(name, permissions));
        self
    }

    /// Add delegation targets.
    pub fn delegates_to(mut self, targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.delegates_to.extend(targets.into_iter().map(Into::into));
        self
    }

    /// Exclude the built-in tool set.
    pub fn without_default_tools(mut self) -> Self {
        self.include_default_tools = false;
        self
    }

    /// Disable permission wrapping for this agent.
    pub fn bypass_permissions(mut self) -> Self {
        self.bypass_permissions = true;
        self
    }

    /// Set a provider-opaque parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Set an extra HTTP header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Reference a registered tool source.
    pub fn with_tool_source(mut self, name: impl Into<String>) -> Self {
        self.mcp_servers.push(ToolSourceRef {
            name: name.into(),
            settings: serde_json::Map::new(),
        });
        self
    }

    /// Validate the definition.
    ///
    /// Delegation targets are resolved later, at swarm construction, because
    /// they reference sibling definitions.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SwarmError::Config("agent name must not be empty".into()));
        }
        if self.description.trim().is_empty() {
            return Err(SwarmError::Config(format!(
                "agent '{}' is missing a description",
                self.name
            )));
        }
        if self.system_prompt.trim().is_empty() {
            return Err(SwarmError::Config(format!(
                "agent '{}' is missing a system prompt",
                self.name
            )));
        }
        if !self.directory.is_dir() {
            return Err(SwarmError::Config(format!(
                "agent '{}' directory does not exist: '{}'",
                self.name,
                self.directory.display()
            )));
        }
        Ok(())
    }
}
