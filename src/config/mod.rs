//! Configuration loading for AgentSwarm
//!
//! Loads the YAML v2 document into the same definitions the builder DSL
//! produces. In order: env-var substitution (`${VAR}` / `${VAR:=default}`,
//! failing on a missing variable without default), shape validation with
//! did-you-mean suggestions, typed deserialization, `all_agents` merging
//! (arrays concatenate, maps merge with the agent winning, scalars
//! agent-wins), agent-reference resolution, and delegation cycle detection.

mod types;
mod validate;

pub(crate) use validate::closest_matches;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::agent::{AgentDefinition, ToolSourceRef, ToolSpec};
use crate::builder::check_delegation_cycles;
use crate::driver::LlmDriver;
use crate::error::{Result, SwarmError};
use crate::hooks::{Callback, HookEvent, HookRegistration, ShellHook};
use crate::swarm::{Swarm, DEFAULT_GLOBAL_CONCURRENCY, DEFAULT_LOCAL_CONCURRENCY};

use types::{RawAgent, RawDocument, RawHook, RawToolEntry};

/// The configuration format version this loader accepts.
pub const CONFIG_VERSION: u32 = 2;

/// A loaded configuration: everything a swarm needs except the driver.
#[derive(Debug)]
pub struct SwarmBlueprint {
    /// Swarm name
    pub name: String,
    /// Lead agent name
    pub lead: String,
    /// Validated agent definitions
    pub agents: Vec<AgentDefinition>,
    /// Swarm-level hook registrations (swarm_start / swarm_stop)
    pub swarm_hooks: Vec<HookRegistration>,
    /// Global semaphore capacity
    pub global_concurrency: usize,
    /// Per-agent semaphore capacity
    pub local_concurrency: usize,
}

impl SwarmBlueprint {
    /// Build a swarm from this blueprint and a driver.
    pub fn into_swarm(self, driver: Arc<dyn LlmDriver>) -> Result<Swarm> {
        let mut builder = Swarm::builder()
            .name(self.name)
            .lead(self.lead)
            .driver(driver)
            .global_concurrency(self.global_concurrency)
            .local_concurrency(self.local_concurrency)
            .agents(self.agents);
        for hook in self.swarm_hooks {
            builder = builder.hook(hook);
        }
        builder.build()
    }
}

/// Load a configuration file. Relative agent directories resolve against the
/// file's parent directory.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<SwarmBlueprint> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| {
        SwarmError::Config(format!("cannot read '{}': {}", path.display(), e))
    })?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    load_config_str(&raw, base_dir)
}

/// Load a configuration document from a string.
pub fn load_config_str(raw: &str, base_dir: impl AsRef<Path>) -> Result<SwarmBlueprint> {
    let base_dir = base_dir.as_ref();
    let interpolated = interpolate_env(raw)?;

    let value: serde_yaml::Value = serde_yaml::from_str(&interpolated)?;
    validate::validate_document(&value)?;
    let document: RawDocument = serde_yaml::from_value(value)?;

    if document.version != CONFIG_VERSION {
        return Err(SwarmError::Config(format!(
            "unsupported configuration version {} (expected {})",
            document.version, CONFIG_VERSION
        )));
    }

    let swarm = document.swarm;
    if swarm.agents.is_empty() {
        return Err(SwarmError::Config("swarm declares no agents".into()));
    }

    let mut agents = Vec::new();
    for (name, raw_agent) in swarm.agents {
        let merged = match &swarm.all_agents {
            Some(overlay) => merge_agent(overlay, raw_agent),
            None => raw_agent,
        };
        agents.push(to_definition(&name, merged, base_dir)?);
    }

    if !agents.iter().any(|a| a.name == swarm.lead) {
        return Err(SwarmError::Config(format!(
            "lead agent '{}' is not defined",
            swarm.lead
        )));
    }
    let known: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
    for agent in &agents {
        for target in &agent.delegates_to {
            if !known.contains(&target.as_str()) {
                return Err(SwarmError::Config(format!(
                    "agent '{}' delegates to unknown agent '{}'",
                    agent.name, target
                )));
            }
        }
    }
    check_delegation_cycles(&agents)?;

    let mut swarm_hooks = Vec::new();
    if let Some(hooks) = swarm.hooks {
        for raw in hooks.swarm_start {
            swarm_hooks.push(to_hook(HookEvent::SwarmStart, raw));
        }
        for raw in hooks.swarm_stop {
            swarm_hooks.push(to_hook(HookEvent::SwarmStop, raw));
        }
    }

    Ok(SwarmBlueprint {
        name: swarm.name,
        lead: swarm.lead,
        agents,
        swarm_hooks,
        global_concurrency: swarm.global_concurrency.unwrap_or(DEFAULT_GLOBAL_CONCURRENCY),
        local_concurrency: swarm.local_concurrency.unwrap_or(DEFAULT_LOCAL_CONCURRENCY),
    })
}

static ENV_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::=([^}]*))?\}").expect("env pattern")
});

/// Substitute `${VAR}` / `${VAR:=default}` everywhere in the raw document.
fn interpolate_env(raw: &str) -> Result<String> {
    let mut missing = Vec::new();
    let substituted = ENV_PATTERN.replace_all(raw, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => match caps.get(2) {
                Some(default) => default.as_str().to_string(),
                None => {
                    missing.push(name.to_string());
                    String::new()
                }
            },
        }
    });
    if missing.is_empty() {
        Ok(substituted.into_owned())
    } else {
        Err(SwarmError::Config(format!(
            "undefined environment variable(s): {}",
            missing.join(", ")
        )))
    }
}

/// Overlay `all_agents` settings under an agent's own: arrays concatenate
/// (overlay first), maps merge with the agent winning per key, scalars
/// agent-wins.
fn merge_agent(overlay: &RawAgent, agent: RawAgent) -> RawAgent {
    let mut parameters = overlay.parameters.clone();
    parameters.extend(agent.parameters);
    let mut headers = overlay.headers.clone();
    headers.extend(agent.headers);

    let mut tools = overlay.tools.clone();
    tools.extend(agent.tools);

    let mut delegates_to = overlay.delegates_to.clone();
    for target in agent.delegates_to {
        if !delegates_to.contains(&target) {
            delegates_to.push(target);
        }
    }

    let mut mcp_servers = overlay.mcp_servers.clone();
    for source in agent.mcp_servers {
        mcp_servers.retain(|s| s.name != source.name);
        mcp_servers.push(source);
    }

    RawAgent {
        description: agent.description.or_else(|| overlay.description.clone()),
        model: agent.model.or_else(|| overlay.model.clone()),
        provider: agent.provider.or_else(|| overlay.provider.clone()),
        base_url: agent.base_url.or_else(|| overlay.base_url.clone()),
        api_version: agent.api_version.or_else(|| overlay.api_version.clone()),
        context_window: agent.context_window.or(overlay.context_window),
        system_prompt: agent.system_prompt.or_else(|| overlay.system_prompt.clone()),
        directory: agent.directory.or_else(|| overlay.directory.clone()),
        tools,
        delegates_to,
        include_default_tools: agent.include_default_tools.or(overlay.include_default_tools),
        bypass_permissions: agent.bypass_permissions.or(overlay.bypass_permissions),
        timeout: agent.timeout.or(overlay.timeout),
        parameters,
        headers,
        mcp_servers,
    }
}

/// Convert a merged raw agent into a validated definition.
fn to_definition(name: &str, raw: RawAgent, base_dir: &Path) -> Result<AgentDefinition> {
    let description = raw.description.ok_or_else(|| {
        SwarmError::Config(format!("agent '{}' is missing a description", name))
    })?;
    let system_prompt = raw.system_prompt.ok_or_else(|| {
        SwarmError::Config(format!("agent '{}' is missing a system prompt", name))
    })?;

    let directory = match raw.directory {
        Some(dir) => {
            let path = PathBuf::from(&dir);
            if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            }
        }
        None => base_dir.to_path_buf(),
    };

    let mut definition = AgentDefinition::new(name, description, system_prompt, directory);
    if let Some(model) = raw.model {
        definition.model = model;
    }
    if let Some(provider) = raw.provider {
        definition.provider = provider;
    }
    definition.base_url = raw.base_url;
    definition.api_version = raw.api_version;
    if let Some(window) = raw.context_window {
        definition.context_window = window;
    }
    if let Some(include) = raw.include_default_tools {
        definition.include_default_tools = include;
    }
    if let Some(bypass) = raw.bypass_permissions {
        definition.bypass_permissions = bypass;
    }
    if let Some(timeout) = raw.timeout {
        definition.timeout = Duration::from_secs(timeout);
    }
    definition.parameters = raw.parameters;
    definition.headers = raw.headers;
    definition.delegates_to = raw.delegates_to;
    definition.tools = raw
        .tools
        .into_iter()
        .map(|entry| match entry {
            RawToolEntry::Name(name) => ToolSpec::named(name),
            RawToolEntry::Spec { name, permissions } => ToolSpec { name, permissions },
        })
        .collect();
    definition.mcp_servers = raw
        .mcp_servers
        .into_iter()
        .map(|source| ToolSourceRef {
            name: source.name,
            settings: source.settings,
        })
        .collect();

    definition.validate()?;
    Ok(definition)
}

fn to_hook(event: HookEvent, raw: RawHook) -> HookRegistration {
    let mut shell = ShellHook::new(raw.command);
    if let Some(secs) = raw.timeout {
        shell = shell.with_timeout(Duration::from_secs(secs));
    }
    HookRegistration::new(event, Callback::Shell(shell))
        .with_priority(raw.priority.unwrap_or(0))
}

/// Collected agent definitions keyed by name, for workflow pools.
pub fn definitions_by_name(blueprint: &SwarmBlueprint) -> HashMap<String, AgentDefinition> {
    blueprint
        .agents
        .iter()
        .map(|a| (a.name.clone(), a.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn minimal_yaml(dir: &Path) -> String {
        format!(
            r#"
version: 2
swarm:
  name: review-team
  lead: lead
  agents:
    lead:
      description: Lead reviewer
      system_prompt: You lead.
      directory: {dir}
      delegates_to: [helper]
    helper:
      description: Helper
      system_prompt: You help.
      directory: {dir}
"#,
            dir = dir.display()
        )
    }

    #[test]
    fn test_load_minimal() {
        let dir = tempdir().unwrap();
        let blueprint = load_config_str(&minimal_yaml(dir.path()), dir.path()).unwrap();
        assert_eq!(blueprint.name, "review-team");
        assert_eq!(blueprint.lead, "lead");
        assert_eq!(blueprint.agents.len(), 2);
        assert_eq!(blueprint.global_concurrency, DEFAULT_GLOBAL_CONCURRENCY);

        let lead = blueprint.agents.iter().find(|a| a.name == "lead").unwrap();
        assert_eq!(lead.delegates_to, vec!["helper"]);
    }

    #[test]
    fn test_version_must_be_two() {
        let dir = tempdir().unwrap();
        let yaml = minimal_yaml(dir.path()).replace("version: 2", "version: 1");
        let err = load_config_str(&yaml, dir.path()).unwrap_err();
        assert!(err.to_string().contains("version 1"));
    }

    #[test]
    fn test_env_interpolation_with_default() {
        let dir = tempdir().unwrap();
        let yaml = minimal_yaml(dir.path()).replace(
            "name: review-team",
            "name: ${AGENTSWARM_TEST_UNSET_NAME:=fallback-team}",
        );
        let blueprint = load_config_str(&yaml, dir.path()).unwrap();
        assert_eq!(blueprint.name, "fallback-team");
    }

    #[test]
    fn test_env_interpolation_missing_fails() {
        let dir = tempdir().unwrap();
        let yaml = minimal_yaml(dir.path())
            .replace("name: review-team", "name: ${AGENTSWARM_TEST_REALLY_UNSET}");
        let err = load_config_str(&yaml, dir.path()).unwrap_err();
        assert!(err.to_string().contains("AGENTSWARM_TEST_REALLY_UNSET"));
    }

    #[test]
    fn test_env_interpolation_set_variable() {
        let dir = tempdir().unwrap();
        std::env::set_var("AGENTSWARM_TEST_SET_NAME", "from-env");
        let yaml = minimal_yaml(dir.path())
            .replace("name: review-team", "name: ${AGENTSWARM_TEST_SET_NAME}");
        let blueprint = load_config_str(&yaml, dir.path()).unwrap();
        assert_eq!(blueprint.name, "from-env");
        std::env::remove_var("AGENTSWARM_TEST_SET_NAME");
    }

    #[test]
    fn test_all_agents_merge() {
        let dir = tempdir().unwrap();
        let yaml = format!(
            r#"
version: 2
swarm:
  name: x
  lead: a
  all_agents:
    model: shared-model
    tools: [Bash]
    parameters:
      temperature: 0.1
      top_p: 0.9
  agents:
    a:
      description: A
      system_prompt: pa
      directory: {dir}
      tools: [Read]
      parameters:
        temperature: 0.7
    b:
      description: B
      system_prompt: pb
      directory: {dir}
      model: own-model
"#,
            dir = dir.path().display()
        );
        let blueprint = load_config_str(&yaml, dir.path()).unwrap();
        let a = blueprint.agents.iter().find(|x| x.name == "a").unwrap();
        let b = blueprint.agents.iter().find(|x| x.name == "b").unwrap();

        // Scalars: agent wins, overlay fills gaps.
        assert_eq!(a.model, "shared-model");
        assert_eq!(b.model, "own-model");
        // Arrays concatenate, overlay first.
        let tool_names: Vec<&str> = a.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tool_names, vec!["Bash", "Read"]);
        // Maps merge with agent winning per key.
        assert_eq!(a.parameters["temperature"], serde_json::json!(0.7));
        assert_eq!(a.parameters["top_p"], serde_json::json!(0.9));
    }

    #[test]
    fn test_delegation_cycle_rejected() {
        let dir = tempdir().unwrap();
        let yaml = format!(
            r#"
version: 2
swarm:
  name: x
  lead: a
  agents:
    a:
      description: A
      system_prompt: pa
      directory: {dir}
      delegates_to: [b]
    b:
      description: B
      system_prompt: pb
      directory: {dir}
      delegates_to: [a]
"#,
            dir = dir.path().display()
        );
        let err = load_config_str(&yaml, dir.path()).unwrap_err();
        assert!(matches!(err, SwarmError::Cycle(_)));
    }

    #[test]
    fn test_unknown_delegate_rejected() {
        let dir = tempdir().unwrap();
        let yaml = minimal_yaml(dir.path()).replace("[helper]", "[ghost]");
        let err = load_config_str(&yaml, dir.path()).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_missing_description_rejected() {
        let dir = tempdir().unwrap();
        let yaml = format!(
            "version: 2\nswarm:\n  name: x\n  lead: a\n  agents:\n    a:\n      system_prompt: p\n      directory: {}\n",
            dir.path().display()
        );
        let err = load_config_str(&yaml, dir.path()).unwrap_err();
        assert!(err.to_string().contains("description"));
    }

    #[test]
    fn test_tool_permissions_normalized() {
        let dir = tempdir().unwrap();
        let yaml = format!(
            r#"
version: 2
swarm:
  name: x
  lead: a
  agents:
    a:
      description: A
      system_prompt: p
      directory: {dir}
      tools:
        - Read
        - name: Write
          permissions:
            allowed_paths: ["src/**"]
            denied_paths: ["src/secret/**"]
"#,
            dir = dir.path().display()
        );
        let blueprint = load_config_str(&yaml, dir.path()).unwrap();
        let agent = &blueprint.agents[0];
        assert!(agent.tools[0].permissions.is_none());
        let perms = agent.tools[1].permissions.as_ref().unwrap();
        assert_eq!(perms.allowed_paths, vec!["src/**"]);
        assert_eq!(perms.denied_paths, vec!["src/secret/**"]);
    }

    #[test]
    fn test_swarm_hooks_loaded() {
        let dir = tempdir().unwrap();
        let yaml = format!(
            r#"
version: 2
swarm:
  name: x
  lead: a
  hooks:
    swarm_stop:
      - command: echo done
        timeout: 10
        priority: 5
  agents:
    a:
      description: A
      system_prompt: p
      directory: {dir}
"#,
            dir = dir.path().display()
        );
        let blueprint = load_config_str(&yaml, dir.path()).unwrap();
        assert_eq!(blueprint.swarm_hooks.len(), 1);
        assert_eq!(blueprint.swarm_hooks[0].event, HookEvent::SwarmStop);
        assert_eq!(blueprint.swarm_hooks[0].priority, 5);
    }

    #[test]
    fn test_relative_directory_resolves_against_base() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("workdir")).unwrap();
        let yaml = r#"
version: 2
swarm:
  name: x
  lead: a
  agents:
    a:
      description: A
      system_prompt: p
      directory: workdir
"#;
        let blueprint = load_config_str(yaml, dir.path()).unwrap();
        assert_eq!(blueprint.agents[0].directory, dir.path().join("workdir"));
    }

    #[test]
    fn test_concurrency_settings() {
        let dir = tempdir().unwrap();
        let yaml = minimal_yaml(dir.path()).replace(
            "  lead: lead",
            "  lead: lead\n  global_concurrency: 2\n  local_concurrency: 4",
        );
        let blueprint = load_config_str(&yaml, dir.path()).unwrap();
        assert_eq!(blueprint.global_concurrency, 2);
        assert_eq!(blueprint.local_concurrency, 4);
    }
}
