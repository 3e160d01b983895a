//! Capability traits for AgentSwarm
//!
//! The orchestration core never speaks a provider wire protocol or an MCP
//! transport itself. Both are capabilities supplied by the embedding
//! application:
//!
//! - [`LlmDriver`] issues one chat completion given messages and tool schemas
//!   and reports token usage; it may stream content deltas through the sink
//!   on the request.
//! - [`ToolSource`] supplies additional tool implementations (the MCP client
//!   adapter lives behind this trait, outside the core).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::message::{Message, ToolCall};
use crate::tools::Tool;

/// Schema of a tool advertised to the LLM.
///
/// Parameters follow JSON-Schema-style primitives (`string`, `integer`,
/// `boolean`, `array`, `object` with `required` lists); the driver serializes
/// them to whatever format its provider expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// The name of the tool (unique within an agent's tool set)
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub parameters: Value,
}

impl ToolSchema {
    /// Create a new tool schema.
    pub fn new(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Token usage and cost for one completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub input_tokens: u64,
    /// Tokens in the completion
    pub output_tokens: u64,
    /// Total tokens (prompt + completion)
    pub total_tokens: u64,
    /// Cost of the prompt tokens, in the driver's currency
    #[serde(default)]
    pub input_cost: f64,
    /// Cost of the completion tokens
    #[serde(default)]
    pub output_cost: f64,
    /// Total cost
    #[serde(default)]
    pub total_cost: f64,
}

impl Usage {
    /// Create usage from token counts with zero cost.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            ..Default::default()
        }
    }

    /// Attach costs to this usage.
    pub fn with_cost(mut self, input_cost: f64, output_cost: f64) -> Self {
        self.input_cost = input_cost;
        self.output_cost = output_cost;
        self.total_cost = input_cost + output_cost;
        self
    }
}

/// One chat completion request.
///
/// Carries the requesting agent's identity and provider routing fields so a
/// single driver instance can serve heterogeneous agents.
pub struct ChatRequest {
    /// Name of the requesting agent
    pub agent: String,
    /// Model identifier
    pub model: String,
    /// Provider identifier (e.g. "anthropic", "openai")
    pub provider: String,
    /// Optional base URL override
    pub base_url: Option<String>,
    /// Optional API version override
    pub api_version: Option<String>,
    /// Extra HTTP headers for the provider
    pub headers: HashMap<String, String>,
    /// Provider-opaque parameters (temperature, top_p, ...)
    pub parameters: serde_json::Map<String, Value>,
    /// The conversation so far
    pub messages: Vec<Message>,
    /// Tools the model may call
    pub tools: Vec<ToolSchema>,
    /// Wall-clock budget for this request
    pub timeout: Duration,
    /// When present, drivers that support streaming send content deltas here.
    /// The scheduler forwards them as `llm_stream_delta` events; control flow
    /// is unchanged either way.
    pub delta_sink: Option<mpsc::UnboundedSender<String>>,
}

/// One chat completion reply.
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// Text content of the response
    pub content: String,
    /// Tool calls requested by the model (empty when the turn is final)
    pub tool_calls: Vec<ToolCall>,
    /// Why the model stopped ("stop", "tool_calls", "length", ...)
    pub finish_reason: String,
    /// Token usage, when the provider reports it
    pub usage: Option<Usage>,
}

impl ChatReply {
    /// A plain text reply with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
            usage: None,
        }
    }

    /// A reply requesting tool calls.
    pub fn with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            finish_reason: "tool_calls".to_string(),
            usage: None,
        }
    }

    /// Attach usage to this reply.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Check whether this reply requests tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Trait for LLM drivers.
///
/// Implementations own the provider wire protocol. The core calls `chat` once
/// per turn, under the swarm's global rate limit and the per-agent timeout.
#[async_trait]
pub trait LlmDriver: Send + Sync {
    /// The driver name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Issue one chat completion.
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply>;

    /// Models this driver recognizes, when it can enumerate them.
    ///
    /// Used to emit a `model_lookup_warning` event at swarm initialization
    /// for definitions referencing unknown models. `None` disables the check.
    fn known_models(&self) -> Option<Vec<String>> {
        None
    }
}

/// Trait for tool sources.
///
/// A tool source produces ready-to-register tool implementations; the MCP
/// client adapter implements this outside the core. Sources referenced by an
/// agent's `mcp_servers` list are discovered during swarm initialization and
/// shut down when execution finishes.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// The source name agents reference in their `mcp_servers` list.
    fn name(&self) -> &str;

    /// Discover the tools this source currently offers.
    async fn discover(&self) -> Result<Vec<Arc<dyn Tool>>>;

    /// Release any connections or child processes. Called in the execute
    /// finally-phase, including on error and cancellation.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
