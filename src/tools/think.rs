//! Think tool for AgentSwarm
//!
//! A no-op sink the model can use to externalize reasoning mid-turn. The
//! thought is not stored anywhere; the tool exists so reasoning does not leak
//! into user-visible content.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Result, SwarmError};

use super::{Tool, ToolContext};

/// No-op reasoning tool.
pub struct ThinkTool;

#[async_trait]
impl Tool for ThinkTool {
    fn name(&self) -> &str {
        "Think"
    }

    fn description(&self) -> &str {
        "Record a thought while working through a problem. Has no side effects."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "thought": {
                    "type": "string",
                    "description": "The thought to record"
                }
            },
            "required": ["thought"]
        })
    }

    async fn invoke(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        args.get("thought")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'thought' argument".into()))?;
        Ok("Thought recorded.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_think_acknowledges() {
        let ctx = ToolContext::new("alpha", "/tmp");
        let out = ThinkTool
            .invoke(json!({"thought": "hmm"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "Thought recorded.");
    }

    #[tokio::test]
    async fn test_think_requires_thought() {
        let ctx = ToolContext::new("alpha", "/tmp");
        assert!(ThinkTool.invoke(json!({}), &ctx).await.is_err());
    }
}
