//! Conversation data model for AgentSwarm
//!
//! This module defines the core types for agent conversations: messages,
//! roles, tool calls requested by the LLM, and tool results fed back to it.
//! Messages are immutable once appended to an agent's history.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System prompts and instructions
    System,
    /// End-user (or delegating agent) input
    User,
    /// LLM output, possibly carrying tool calls
    Assistant,
    /// Tool results responding to an assistant tool call
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: Role,
    /// The text content of the message
    pub content: String,
    /// Tool calls made by the assistant (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// ID of the tool call this message is responding to (tool role only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a new assistant message with no tool calls.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create an assistant message carrying tool calls.
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Create a tool-role message responding to the given tool call id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Check whether this message carries tool calls.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|tc| !tc.is_empty())
    }
}

/// A tool call requested by the LLM.
///
/// The `id` is unique within a turn and links the eventual tool-role result
/// message back to this request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call within the turn
    pub id: String,
    /// Name of the tool to execute
    pub name: String,
    /// Structured arguments matching the tool's parameter schema
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// The outcome of executing one tool call.
///
/// Errors are data: a failing tool produces `success: false` with the error
/// text in `content` (and `error`), never an exception at the scheduler
/// surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The tool call this result responds to
    pub tool_call_id: String,
    /// The content fed back to the LLM
    pub content: String,
    /// Whether the tool completed successfully
    pub success: bool,
    /// Error description when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result.
    pub fn ok(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            success: true,
            error: None,
        }
    }

    /// Create a failed result. The content is what the LLM sees.
    pub fn failure(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            tool_call_id: tool_call_id.into(),
            error: Some(content.clone()),
            content,
            success: false,
        }
    }

    /// Create the result recorded for a call aborted by cancellation.
    pub fn cancelled(tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: "cancelled".to_string(),
            success: false,
            error: Some("cancelled".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::user("u").role, Role::User);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
        let tool = Message::tool_result("call_1", "done");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_has_tool_calls() {
        let plain = Message::assistant("hi");
        assert!(!plain.has_tool_calls());

        let with_tools = Message::assistant_with_tools(
            "",
            vec![ToolCall::new("call_1", "Read", json!({"file_path": "a.txt"}))],
        );
        assert!(with_tools.has_tool_calls());

        let empty = Message::assistant_with_tools("", vec![]);
        assert!(!empty.has_tool_calls());
    }

    #[test]
    fn test_tool_result_ok() {
        let result = ToolResult::ok("call_1", "file contents");
        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.content, "file contents");
    }

    #[test]
    fn test_tool_result_failure_mirrors_content() {
        let result = ToolResult::failure("call_1", "File not found");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("File not found"));
        assert_eq!(result.content, "File not found");
    }

    #[test]
    fn test_tool_result_cancelled() {
        let result = ToolResult::cancelled("call_9");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("cancelled"));
    }

    #[test]
    fn test_message_serialization_skips_empty_fields() {
        let msg = Message::user("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_call_id").is_none());
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_role_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        let role: Role = serde_json::from_str("\"tool\"").unwrap();
        assert_eq!(role, Role::Tool);
    }
}
