//! Configuration validation with unknown field detection.
//!
//! The YAML document is checked against the known field names before typed
//! deserialization, so unknown keys fail with "did you mean?" suggestions.
//! Only `parameters`, `headers` and tool source settings are opaque.

use serde_yaml::Value;

use crate::error::{Result, SwarmError};

/// Known top-level document fields.
const KNOWN_TOP_LEVEL: &[&str] = &["version", "swarm"];

/// Known fields of the `swarm` section.
const KNOWN_SWARM: &[&str] = &[
    "name",
    "lead",
    "all_agents",
    "agents",
    "hooks",
    "global_concurrency",
    "local_concurrency",
];

/// Known fields of an agent entry (and of `all_agents`).
const KNOWN_AGENT: &[&str] = &[
    "description",
    "model",
    "provider",
    "base_url",
    "api_version",
    "context_window",
    "system_prompt",
    "directory",
    "tools",
    "delegates_to",
    "include_default_tools",
    "bypass_permissions",
    "timeout",
    "parameters",
    "headers",
    "mcp_servers",
];

/// Known fields of a `{name, permissions}` tool entry.
const KNOWN_TOOL_ENTRY: &[&str] = &["name", "permissions"];

/// Known fields of a permissions map.
const KNOWN_PERMISSIONS: &[&str] = &["allowed_paths", "denied_paths"];

/// Hook events supported at swarm level.
const KNOWN_SWARM_HOOKS: &[&str] = &["swarm_start", "swarm_stop"];

/// Known fields of a hook entry.
const KNOWN_HOOK_ENTRY: &[&str] = &["command", "timeout", "priority"];

/// Simple Levenshtein distance for "did you mean?" suggestions.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let mut matrix = vec![vec![0usize; b_len + 1]; a_len + 1];

    for (i, row) in matrix.iter_mut().enumerate().take(a_len + 1) {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate().take(b_len + 1) {
        *cell = j;
    }

    for (i, ca) in a.chars().enumerate() {
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            matrix[i + 1][j + 1] = std::cmp::min(
                std::cmp::min(matrix[i][j + 1] + 1, matrix[i + 1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }
    matrix[a_len][b_len]
}

/// Suggest the closest known field name (if distance <= 3).
fn suggest_field(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| format!(" — did you mean '{}'?", k))
}

/// The closest candidates to `name`, nearest first, at most three.
pub(crate) fn closest_matches(name: &str, candidates: &[String]) -> Vec<String> {
    let mut scored: Vec<(usize, &String)> = candidates
        .iter()
        .map(|c| (levenshtein(name, c), c))
        .collect();
    scored.sort_by_key(|(d, _)| *d);
    scored
        .into_iter()
        .take(3)
        .map(|(_, c)| c.clone())
        .collect()
}

fn unknown_key(path: &str, key: &str, known: &[&str]) -> SwarmError {
    let suggestion = suggest_field(key, known).unwrap_or_default();
    SwarmError::Config(format!("unknown field '{}' at {}{}", key, path, suggestion))
}

fn check_keys(value: &Value, path: &str, known: &[&str]) -> Result<()> {
    let Some(mapping) = value.as_mapping() else {
        return Err(SwarmError::Config(format!("{} must be a mapping", path)));
    };
    for key in mapping.keys() {
        let Some(key) = key.as_str() else {
            return Err(SwarmError::Config(format!(
                "{} has a non-string key",
                path
            )));
        };
        if !known.contains(&key) {
            return Err(unknown_key(path, key, known));
        }
    }
    Ok(())
}

/// Validate the raw document shape before typed deserialization.
pub(crate) fn validate_document(raw: &Value) -> Result<()> {
    check_keys(raw, "document root", KNOWN_TOP_LEVEL)?;

    let Some(swarm) = raw.get("swarm") else {
        return Err(SwarmError::Config("missing 'swarm' section".into()));
    };
    check_keys(swarm, "swarm", KNOWN_SWARM)?;

    if let Some(all_agents) = swarm.get("all_agents") {
        validate_agent(all_agents, "swarm.all_agents")?;
    }

    if let Some(agents) = swarm.get("agents").and_then(Value::as_mapping) {
        for (name, agent) in agents {
            let name = name.as_str().unwrap_or("?");
            validate_agent(agent, &format!("swarm.agents.{}", name))?;
        }
    }

    if let Some(hooks) = swarm.get("hooks") {
        check_keys(hooks, "swarm.hooks", KNOWN_SWARM_HOOKS)?;
        if let Some(mapping) = hooks.as_mapping() {
            for (event, entries) in mapping {
                let event = event.as_str().unwrap_or("?");
                let Some(entries) = entries.as_sequence() else {
                    return Err(SwarmError::Config(format!(
                        "swarm.hooks.{} must be a list",
                        event
                    )));
                };
                for (i, entry) in entries.iter().enumerate() {
                    check_keys(
                        entry,
                        &format!("swarm.hooks.{}[{}]", event, i),
                        KNOWN_HOOK_ENTRY,
                    )?;
                }
            }
        }
    }
    Ok(())
}

fn validate_agent(agent: &Value, path: &str) -> Result<()> {
    check_keys(agent, path, KNOWN_AGENT)?;

    if let Some(tools) = agent.get("tools") {
        let Some(tools) = tools.as_sequence() else {
            return Err(SwarmError::Config(format!("{}.tools must be a list", path)));
        };
        for (i, entry) in tools.iter().enumerate() {
            match entry {
                Value::String(_) => {}
                Value::Mapping(_) => {
                    let entry_path = format!("{}.tools[{}]", path, i);
                    check_keys(entry, &entry_path, KNOWN_TOOL_ENTRY)?;
                    if let Some(permissions) = entry.get("permissions") {
                        check_keys(
                            permissions,
                            &format!("{}.permissions", entry_path),
                            KNOWN_PERMISSIONS,
                        )?;
                    }
                }
                _ => {
                    return Err(SwarmError::Config(format!(
                        "{}.tools[{}] must be a tool name or a {{name, permissions}} map",
                        path, i
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("hello", "helo"), 1);
    }

    #[test]
    fn test_levenshtein_different() {
        assert!(levenshtein("hello", "world") > 3);
    }

    #[test]
    fn test_suggest_field_match() {
        let suggestion = suggest_field("delagates_to", KNOWN_AGENT).unwrap();
        assert!(suggestion.contains("delegates_to"));
    }

    #[test]
    fn test_suggest_field_no_match() {
        assert!(suggest_field("xyzqwerty", KNOWN_AGENT).is_none());
    }

    #[test]
    fn test_closest_matches_ordering() {
        let candidates = vec![
            "claude-sonnet-4-5".to_string(),
            "claude-opus-4".to_string(),
            "gpt-5".to_string(),
        ];
        let matches = closest_matches("claude-sonet-4-5", &candidates);
        assert_eq!(matches[0], "claude-sonnet-4-5");
        assert_eq!(matches.len(), 3);
    }

    #[test]
    fn test_validate_rejects_unknown_swarm_key() {
        let raw: Value =
            serde_yaml::from_str("version: 2\nswarm:\n  name: x\n  lead: a\n  leed: b\n  agents: {}")
                .unwrap();
        let err = validate_document(&raw).unwrap_err();
        assert!(err.to_string().contains("'leed'"));
        assert!(err.to_string().contains("did you mean 'lead'"));
    }

    #[test]
    fn test_validate_rejects_unknown_agent_key() {
        let raw: Value = serde_yaml::from_str(
            "version: 2\nswarm:\n  name: x\n  lead: a\n  agents:\n    a:\n      descriptionn: hi",
        )
        .unwrap();
        let err = validate_document(&raw).unwrap_err();
        assert!(err.to_string().contains("swarm.agents.a"));
        assert!(err.to_string().contains("description"));
    }

    #[test]
    fn test_validate_accepts_opaque_parameters() {
        let raw: Value = serde_yaml::from_str(
            "version: 2\nswarm:\n  name: x\n  lead: a\n  agents:\n    a:\n      parameters:\n        anything_goes: 1",
        )
        .unwrap();
        assert!(validate_document(&raw).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_hook_event() {
        let raw: Value = serde_yaml::from_str(
            "version: 2\nswarm:\n  name: x\n  lead: a\n  agents: {}\n  hooks:\n    pre_tool_use: []",
        )
        .unwrap();
        let err = validate_document(&raw).unwrap_err();
        assert!(err.to_string().contains("pre_tool_use"));
    }

    #[test]
    fn test_validate_tool_entry_shapes() {
        let raw: Value = serde_yaml::from_str(
            "version: 2\nswarm:\n  name: x\n  lead: a\n  agents:\n    a:\n      tools:\n        - Bash\n        - name: Write\n          permissions:\n            allowed_paths: [\"src/**\"]",
        )
        .unwrap();
        assert!(validate_document(&raw).is_ok());

        let raw: Value = serde_yaml::from_str(
            "version: 2\nswarm:\n  name: x\n  lead: a\n  agents:\n    a:\n      tools:\n        - 42",
        )
        .unwrap();
        assert!(validate_document(&raw).is_err());
    }
}
