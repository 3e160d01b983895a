//! Scratchpad tools for AgentSwarm
//!
//! Session-scoped hierarchical KV shared by every agent in the swarm. Paths
//! are slash-separated ("research/findings"). Size caps live in
//! [`crate::state::Scratchpad`].

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Result, SwarmError};

use super::{Tool, ToolContext};

/// Tool that writes one scratchpad entry.
pub struct ScratchpadWriteTool;

#[async_trait]
impl Tool for ScratchpadWriteTool {
    fn name(&self) -> &str {
        "ScratchpadWrite"
    }

    fn description(&self) -> &str {
        "Store content in the swarm-shared scratchpad under a slash-separated path. Other agents can read it."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Scratchpad path, e.g. 'research/findings'"
                },
                "content": {
                    "type": "string",
                    "description": "Content to store (max 1 MB)"
                },
                "title": {
                    "type": "string",
                    "description": "Short title shown in listings"
                }
            },
            "required": ["file_path", "content", "title"]
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let path = args
            .get("file_path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'file_path' argument".into()))?;
        let content = args
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'content' argument".into()))?;
        let title = args
            .get("title")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'title' argument".into()))?;

        ctx.scratchpad()
            .write(path, content, title)
            .map_err(SwarmError::Tool)?;
        Ok(format!("Stored {} bytes at '{}'", content.len(), path))
    }
}

/// Tool that reads one scratchpad entry.
pub struct ScratchpadReadTool;

#[async_trait]
impl Tool for ScratchpadReadTool {
    fn name(&self) -> &str {
        "ScratchpadRead"
    }

    fn description(&self) -> &str {
        "Read an entry from the swarm-shared scratchpad"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Scratchpad path to read"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let path = args
            .get("file_path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'file_path' argument".into()))?;

        match ctx.scratchpad().read(path) {
            Some(entry) => Ok(entry.content),
            None => Err(SwarmError::Tool(format!(
                "No scratchpad entry at '{}'",
                path
            ))),
        }
    }
}

/// Tool that lists scratchpad entries, optionally under a prefix.
pub struct ScratchpadListTool;

#[async_trait]
impl Tool for ScratchpadListTool {
    fn name(&self) -> &str {
        "ScratchpadList"
    }

    fn description(&self) -> &str {
        "List scratchpad entries (path and title), optionally filtered by a path prefix"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prefix": {
                    "type": "string",
                    "description": "Optional path prefix filter"
                }
            },
            "required": []
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let prefix = args.get("prefix").and_then(|v| v.as_str());
        let entries = ctx.scratchpad().list(prefix);
        if entries.is_empty() {
            return Ok("Scratchpad is empty".to_string());
        }
        Ok(entries
            .into_iter()
            .map(|(path, title)| format!("{} — {}", path, title))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
