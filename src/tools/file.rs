//! File tools for AgentSwarm
//!
//! Read, Write, Edit and MultiEdit. All paths resolve relative to the calling
//! agent's directory and are canonicalized before use.
//!
//! Write and Edit enforce read-before-write: modifying a file that already
//! exists requires a prior `Read` of that file by the same agent, tracked in
//! the swarm's [`crate::state::ReadTracker`]. Writes go through a temp file
//! plus rename so a crash never leaves a half-written target.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;

use crate::error::{Result, SwarmError};

use super::{resolve_existing, resolve_for_write, Tool, ToolContext};

/// Error text for a Write/Edit without a prior Read.
const READ_FIRST: &str = "Cannot write without reading first";

/// Write `content` to `path` atomically (temp file in the same directory,
/// then rename).
async fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp = parent.join(format!(
        ".{}.tmp-{}",
        path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
        uuid::Uuid::new_v4().simple()
    ));
    tokio::fs::write(&tmp, content)
        .await
        .map_err(|e| SwarmError::Tool(format!("Failed to write '{}': {}", tmp.display(), e)))?;
    tokio::fs::rename(&tmp, path).await.map_err(|e| {
        SwarmError::Tool(format!("Failed to replace '{}': {}", path.display(), e))
    })?;
    Ok(())
}

/// Guard a mutation of `path`: existing files must have been read by this
/// agent first.
fn check_read_before_write(path: &Path, ctx: &ToolContext) -> Result<()> {
    if path.exists() && !ctx.read_tracker().has_read(ctx.agent(), path) {
        return Err(SwarmError::Tool(format!(
            "{}: '{}'",
            READ_FIRST,
            path.display()
        )));
    }
    Ok(())
}

/// Tool for reading file contents.
///
/// Registers the canonical path in the agent's read tracker, unlocking
/// subsequent Write/Edit calls against the same file.
pub struct ReadTool;

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "Read"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the given path. Required before writing or editing an existing file."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to read"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let raw = args
            .get("file_path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'file_path' argument".into()))?;

        let path = resolve_existing(raw, ctx)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SwarmError::Tool(format!("Failed to read '{}': {}", path.display(), e)))?;

        ctx.read_tracker().record(ctx.agent(), &path);

        if content.is_empty() {
            Ok("(empty file)".to_string())
        } else {
            Ok(content)
        }
    }
}

/// Tool for writing a file.
///
/// Creates the file if absent. Overwriting an existing file requires a prior
/// Read by the same agent.
pub struct WriteTool;

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        "Write"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating it if necessary. Overwriting an existing file requires reading it first."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                }
            },
            "required": ["file_path", "content"]
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let raw = args
            .get("file_path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'file_path' argument".into()))?;
        let content = args
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'content' argument".into()))?;

        let path = resolve_for_write(raw, ctx)?;
        check_read_before_write(&path, ctx)?;

        write_atomic(&path, content).await?;
        // The agent knows the file's content now; allow follow-up edits.
        ctx.read_tracker().record(ctx.agent(), &path);

        Ok(format!(
            "Successfully wrote {} bytes to {}",
            content.len(),
            path.display()
        ))
    }
}

/// Apply one exact string replacement to `content`.
fn apply_edit(
    content: &str,
    old: &str,
    new: &str,
    replace_all: bool,
    path: &Path,
) -> Result<String> {
    let occurrences = content.matches(old).count();
    if occurrences == 0 {
        let shown = if old.len() > 50 { &old[..50] } else { old };
        return Err(SwarmError::Tool(format!(
            "Text '{}' not found in '{}'",
            shown,
            path.display()
        )));
    }
    if occurrences > 1 && !replace_all {
        return Err(SwarmError::Tool(format!(
            "Text matches {} times in '{}'; pass replace_all to replace every occurrence",
            occurrences,
            path.display()
        )));
    }
    Ok(if replace_all {
        content.replace(old, new)
    } else {
        content.replacen(old, new, 1)
    })
}

/// Tool for editing a file by exact string replacement.
pub struct EditTool;

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        "Edit"
    }

    fn description(&self) -> &str {
        "Replace an exact string in a file. Fails if the string is absent or ambiguous (unless replace_all is set). Requires reading the file first."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to edit"
                },
                "old_string": {
                    "type": "string",
                    "description": "The exact text to replace"
                },
                "new_string": {
                    "type": "string",
                    "description": "The replacement text"
                },
                "replace_all": {
                    "type": "boolean",
                    "description": "Replace every occurrence instead of requiring a unique match"
                }
            },
            "required": ["file_path", "old_string", "new_string"]
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let raw = args
            .get("file_path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'file_path' argument".into()))?;
        let old = args
            .get("old_string")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'old_string' argument".into()))?;
        let new = args
            .get("new_string")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'new_string' argument".into()))?;
        let replace_all = args
            .get("replace_all")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let path = resolve_existing(raw, ctx)?;
        check_read_before_write(&path, ctx)?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SwarmError::Tool(format!("Failed to read '{}': {}", path.display(), e)))?;
        let replaced = content.matches(old).count();
        let updated = apply_edit(&content, old, new, replace_all, &path)?;
        write_atomic(&path, &updated).await?;

        let applied = if replace_all { replaced } else { 1 };
        Ok(format!(
            "Successfully replaced {} occurrence(s) in {}",
            applied,
            path.display()
        ))
    }
}

/// Tool for applying a batch of edits to one file, all-or-nothing.
///
/// Edits are applied sequentially to an in-memory copy; the file is only
/// written when every edit succeeds, so a failing edit rolls back the batch.
pub struct MultiEditTool;

#[async_trait]
impl Tool for MultiEditTool {
    fn name(&self) -> &str {
        "MultiEdit"
    }

    fn description(&self) -> &str {
        "Apply several exact string replacements to one file in order. If any edit fails, none are applied. Requires reading the file first."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to edit"
                },
                "edits": {
                    "type": "array",
                    "description": "Edits applied in order",
                    "items": {
                        "type": "object",
                        "properties": {
                            "old_string": { "type": "string" },
                            "new_string": { "type": "string" },
                            "replace_all": { "type": "boolean" }
                        },
                        "required": ["old_string", "new_string"]
                    }
                }
            },
            "required": ["file_path", "edits"]
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let raw = args
            .get("file_path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'file_path' argument".into()))?;
        let edits = args
            .get("edits")
            .and_then(|v| v.as_array())
            .ok_or_else(|| SwarmError::Tool("Missing 'edits' argument".into()))?;
        if edits.is_empty() {
            return Err(SwarmError::Tool("'edits' must not be empty".into()));
        }

        let path = resolve_existing(raw, ctx)?;
        check_read_before_write(&path, ctx)?;

        let mut content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SwarmError::Tool(format!("Failed to read '{}': {}", path.display(), e)))?;

        for (index, edit) in edits.iter().enumerate() {
            let old = edit
                .get("old_string")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    SwarmError::Tool(format!("Edit {} is missing 'old_string'", index + 1))
                })?;
            let new = edit
                .get("new_string")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    SwarmError::Tool(format!("Edit {} is missing 'new_string'", index + 1))
                })?;
            let replace_all = edit
                .get("replace_all")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            content = apply_edit(&content, old, new, replace_all, &path)
                .map_err(|e| SwarmError::Tool(format!("Edit {} failed: {}", index + 1, e)))?;
        }

        write_atomic(&path, &content).await?;
        Ok(format!(
            "Successfully applied {} edit(s) to {}",
            edits.len(),
            path.display()
        ))
    }
}
