//! Structured log events for AgentSwarm
//!
//! Every observable action in a swarm execution emits a typed [`LogEvent`].
//! Events are appended to the execution's collected log (returned on the
//! result) and dispatched to every subscriber registered before the execute
//! call started. The subscriber list is frozen at execute start; late
//! registration is a `State` error.
//!
//! Serialized events carry a `type` tag and an ISO-8601 UTC `timestamp`,
//! suitable for newline-delimited JSON streams.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::driver::Usage;
use crate::error::{Result, SwarmError};

/// Terminal status of a swarm execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The lead agent produced a final message.
    Success,
    /// A fatal error (driver failure, configuration) aborted the run.
    Error,
    /// The run was cancelled through the cancellation handle.
    Cancelled,
}

/// A typed log event emitted during swarm execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    /// Execution entry.
    SwarmStart {
        timestamp: DateTime<Utc>,
        swarm_name: String,
        lead_agent: String,
        prompt: String,
    },
    /// Execution exit, with aggregate accounting.
    SwarmStop {
        timestamp: DateTime<Utc>,
        status: ExecutionStatus,
        /// Wall-clock seconds for the whole execute call
        duration: f64,
        total_cost: f64,
        total_tokens: u64,
        llm_requests: u64,
        tool_calls: u64,
        agents_involved: Vec<String>,
    },
    /// An agent is about to issue an LLM request.
    UserRequest {
        timestamp: DateTime<Utc>,
        agent: String,
        model: String,
        provider: String,
        message_count: usize,
        tools: Vec<String>,
        delegates_to: Vec<String>,
    },
    /// A streaming content delta from the driver.
    LlmStreamDelta {
        timestamp: DateTime<Utc>,
        agent: String,
        content_delta: String,
    },
    /// An LLM response arrived.
    AgentStop {
        timestamp: DateTime<Utc>,
        agent: String,
        model: String,
        content: String,
        tool_calls: Vec<String>,
        finish_reason: String,
        usage: Usage,
    },
    /// A non-delegation tool call is starting.
    ToolCall {
        timestamp: DateTime<Utc>,
        agent: String,
        tool_call_id: String,
        tool: String,
        arguments: Value,
    },
    /// A non-delegation tool call finished.
    ToolResult {
        timestamp: DateTime<Utc>,
        agent: String,
        tool_call_id: String,
        result: String,
    },
    /// An agent handed a task to a delegate.
    AgentDelegation {
        timestamp: DateTime<Utc>,
        agent: String,
        tool_call_id: String,
        delegate_to: String,
        arguments: Value,
    },
    /// A delegate returned its final content to the caller.
    DelegationResult {
        timestamp: DateTime<Utc>,
        agent: String,
        delegate_from: String,
        tool_call_id: String,
        result: String,
    },
    /// A delegate failed; the caller receives a failure tool result.
    DelegationError {
        timestamp: DateTime<Utc>,
        agent: String,
        delegate_to: String,
        error_class: String,
        error_message: String,
    },
    /// An agent first crossed a context usage threshold (80 or 90 percent).
    ContextLimitWarning {
        timestamp: DateTime<Utc>,
        agent: String,
        threshold: u8,
        /// Current usage as a percentage of the context window
        current_usage: f64,
        tokens_used: u64,
        tokens_remaining: u64,
        context_limit: u64,
    },
    /// A definition references a model the driver does not recognize.
    ModelLookupWarning {
        timestamp: DateTime<Utc>,
        agent: String,
        model: String,
        error_message: String,
        suggestions: Vec<String>,
    },
    /// A hook callback failed; the failure was converted to a halt.
    CallbackError {
        timestamp: DateTime<Utc>,
        agent: Option<String>,
        event: String,
        error_message: String,
    },
    /// A workflow node is starting.
    NodeStart {
        timestamp: DateTime<Utc>,
        node: String,
        agent_less: bool,
        agents: Vec<String>,
        dependencies: Vec<String>,
    },
    /// A workflow node finished (or was skipped by its transformer).
    NodeStop {
        timestamp: DateTime<Utc>,
        node: String,
        agent_less: bool,
        skipped: bool,
        agents: Vec<String>,
        duration: f64,
    },
}

impl LogEvent {
    /// The event's `type` tag as it appears in serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            LogEvent::SwarmStart { .. } => "swarm_start",
            LogEvent::SwarmStop { .. } => "swarm_stop",
            LogEvent::UserRequest { .. } => "user_request",
            LogEvent::LlmStreamDelta { .. } => "llm_stream_delta",
            LogEvent::AgentStop { .. } => "agent_stop",
            LogEvent::ToolCall { .. } => "tool_call",
            LogEvent::ToolResult { .. } => "tool_result",
            LogEvent::AgentDelegation { .. } => "agent_delegation",
            LogEvent::DelegationResult { .. } => "delegation_result",
            LogEvent::DelegationError { .. } => "delegation_error",
            LogEvent::ContextLimitWarning { .. } => "context_limit_warning",
            LogEvent::ModelLookupWarning { .. } => "model_lookup_warning",
            LogEvent::CallbackError { .. } => "callback_error",
            LogEvent::NodeStart { .. } => "node_start",
            LogEvent::NodeStop { .. } => "node_stop",
        }
    }
}

/// A log event subscriber callable.
pub type Subscriber = Arc<dyn Fn(&LogEvent) + Send + Sync>;

/// Collects events and dispatches them to subscribers.
///
/// Subscribers may be added until [`EventCollector::freeze`] is called (the
/// swarm freezes at execute start); afterwards registration fails with a
/// `State` error. Emission appends to the collected log and invokes each
/// subscriber in registration order.
pub struct EventCollector {
    subscribers: RwLock<Vec<Subscriber>>,
    frozen: AtomicBool,
    events: Mutex<Vec<LogEvent>>,
}

impl EventCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            frozen: AtomicBool::new(false),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Register a subscriber. Fails once the collector is frozen.
    pub fn subscribe(&self, subscriber: Subscriber) -> Result<()> {
        if self.frozen.load(Ordering::SeqCst) {
            return Err(SwarmError::State(
                "log subscribers are frozen once execution has started".to_string(),
            ));
        }
        self.subscribers.write().expect("subscriber lock").push(subscriber);
        Ok(())
    }

    /// Freeze the subscriber list. Idempotent.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    /// Whether the subscriber list is frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// Emit one event: append to the collected log and notify subscribers.
    pub fn emit(&self, event: LogEvent) {
        tracing::debug!(event = event.kind(), "log event");
        {
            let subscribers = self.subscribers.read().expect("subscriber lock");
            for subscriber in subscribers.iter() {
                subscriber(&event);
            }
        }
        self.events.lock().expect("event lock").push(event);
    }

    /// Snapshot of everything emitted so far.
    pub fn snapshot(&self) -> Vec<LogEvent> {
        self.events.lock().expect("event lock").clone()
    }

    /// Number of events emitted so far.
    pub fn len(&self) -> usize {
        self.events.lock().expect("event lock").len()
    }

    /// Whether nothing has been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Current UTC timestamp for event construction.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn sample_event() -> LogEvent {
        LogEvent::SwarmStart {
            timestamp: now(),
            swarm_name: "test".to_string(),
            lead_agent: "lead".to_string(),
            prompt: "hello".to_string(),
        }
    }

    #[test]
    fn test_event_type_tag_serialization() {
        let json = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(json["type"], "swarm_start");
        assert!(json["timestamp"].is_string());
        assert_eq!(json["lead_agent"], "lead");
    }

    #[test]
    fn test_event_kind_matches_serde_tag() {
        let event = LogEvent::ContextLimitWarning {
            timestamp: now(),
            agent: "a".to_string(),
            threshold: 80,
            current_usage: 82.0,
            tokens_used: 8200,
            tokens_remaining: 1800,
            context_limit: 10000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
    }

    #[test]
    fn test_collector_emits_to_subscribers_in_order() {
        let collector = EventCollector::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        collector
            .subscribe(Arc::new(move |e: &LogEvent| {
                seen_clone.lock().unwrap().push(e.kind());
            }))
            .unwrap();
        collector.freeze();

        collector.emit(sample_event());
        collector.emit(LogEvent::SwarmStop {
            timestamp: now(),
            status: ExecutionStatus::Success,
            duration: 0.1,
            total_cost: 0.0,
            total_tokens: 0,
            llm_requests: 0,
            tool_calls: 0,
            agents_involved: vec![],
        });

        assert_eq!(*seen.lock().unwrap(), vec!["swarm_start", "swarm_stop"]);
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_collector_subscribe_after_freeze_fails() {
        let collector = EventCollector::new();
        collector.freeze();
        let result = collector.subscribe(Arc::new(|_| {}));
        assert!(matches!(result, Err(SwarmError::State(_))));
    }

    #[test]
    fn test_collector_every_subscriber_sees_every_event() {
        let collector = EventCollector::new();
        let count_a = Arc::new(AtomicUsize::new(0));
        let count_b = Arc::new(AtomicUsize::new(0));
        for counter in [&count_a, &count_b] {
            let counter = Arc::clone(counter);
            collector
                .subscribe(Arc::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }
        collector.freeze();

        for _ in 0..5 {
            collector.emit(sample_event());
        }
        assert_eq!(count_a.load(Ordering::SeqCst), 5);
        assert_eq!(count_b.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&ExecutionStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }
}
