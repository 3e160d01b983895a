//! Todo list tool for AgentSwarm
//!
//! `TodoWrite` replaces the calling agent's todo list wholesale. The runner
//! resets the agent's "messages since last TodoWrite" counter whenever this
//! tool runs, which drives the periodic reminder injection.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Result, SwarmError};
use crate::state::TodoItem;

use super::{Tool, ToolContext};

/// Tool that replaces the agent's todo list.
pub struct TodoWriteTool;

#[async_trait]
impl Tool for TodoWriteTool {
    fn name(&self) -> &str {
        "TodoWrite"
    }

    fn description(&self) -> &str {
        "Replace your todo list. Use it to plan multi-step work and track progress; each item has content, status and an activeForm label."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "description": "The complete new todo list",
                    "items": {
                        "type": "object",
                        "properties": {
                            "content": { "type": "string" },
                            "status": {
                                "type": "string",
                                "enum": ["pending", "in_progress", "completed"]
                            },
                            "activeForm": { "type": "string" }
                        },
                        "required": ["content", "status", "activeForm"]
                    }
                }
            },
            "required": ["todos"]
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let raw = args
            .get("todos")
            .cloned()
            .ok_or_else(|| SwarmError::Tool("Missing 'todos' argument".into()))?;
        let items: Vec<TodoItem> = serde_json::from_value(raw)
            .map_err(|e| SwarmError::Tool(format!("Invalid todo list: {}", e)))?;

        let count = items.len();
        ctx.todos().replace(ctx.agent(), items);
        Ok(format!("Todo list updated ({} item(s))", count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TodoStatus;

    #[tokio::test]
    async fn test_todo_write_replaces_list() {
        let ctx = ToolContext::new("alpha", "/tmp");
        TodoWriteTool
            .invoke(
                json!({"todos": [
                    {"content": "a", "status": "pending", "activeForm": "Doing a"},
                    {"content": "b", "status": "in_progress", "activeForm": "Doing b"}
                ]}),
                &ctx,
            )
            .await
            .unwrap();

        let items = ctx.todos().get("alpha");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].status, TodoStatus::InProgress);

        TodoWriteTool
            .invoke(
                json!({"todos": [
                    {"content": "b", "status": "completed", "activeForm": "Doing b"}
                ]}),
                &ctx,
            )
            .await
            .unwrap();
        let items = ctx.todos().get("alpha");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status, TodoStatus::Completed);
    }

    #[tokio::test]
    async fn test_todo_write_rejects_bad_status() {
        let ctx = ToolContext::new("alpha", "/tmp");
        let err = TodoWriteTool
            .invoke(
                json!({"todos": [{"content": "a", "status": "later", "activeForm": "x"}]}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid todo list"));
    }

    #[tokio::test]
    async fn test_todo_write_requires_todos() {
        let ctx = ToolContext::new("alpha", "/tmp");
        let err = TodoWriteTool.invoke(json!({}), &ctx).await.unwrap_err();
        assert!(err.to_string().contains("Missing 'todos'"));
    }
}
