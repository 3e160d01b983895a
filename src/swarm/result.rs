//! Execution results for AgentSwarm
//!
//! [`ExecutionResult`] is what `Swarm::execute` returns: the lead's final
//! content plus accounting aggregated from the collected log events. Driver
//! failures are captured here rather than raised, so the logs survive.

use std::time::Duration;

use crate::events::{ExecutionStatus, LogEvent};

/// The outcome of one swarm execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The lead agent's final message content (empty on failure)
    pub content: String,
    /// The lead agent's name
    pub agent: String,
    /// Whether execution completed successfully
    pub success: bool,
    /// Terminal status (success, error, cancelled)
    pub status: ExecutionStatus,
    /// The error message, when `success` is false
    pub error: Option<String>,
    /// Every log event emitted during the execution
    pub logs: Vec<LogEvent>,
    /// Sum of usage costs across all LLM calls
    pub total_cost: f64,
    /// Sum of total tokens across all LLM calls
    pub total_tokens: u64,
    /// Number of LLM requests issued
    pub llm_requests: u64,
    /// Number of tool calls (including delegations)
    pub tool_calls_count: u64,
    /// Agents that issued at least one LLM request, in first-seen order
    pub agents_involved: Vec<String>,
    /// Wall-clock duration of the execute call
    pub duration: Duration,
}

/// Accounting totals scanned out of the event log.
#[derive(Debug, Clone, Default)]
pub(crate) struct Aggregates {
    pub total_cost: f64,
    pub total_tokens: u64,
    pub llm_requests: u64,
    pub tool_calls: u64,
    pub agents_involved: Vec<String>,
}

/// Aggregate accounting from the collected events.
pub(crate) fn aggregate(logs: &[LogEvent]) -> Aggregates {
    let mut totals = Aggregates::default();
    for event in logs {
        match event {
            LogEvent::AgentStop { agent, usage, .. } => {
                totals.llm_requests += 1;
                totals.total_cost += usage.total_cost;
                totals.total_tokens += usage.total_tokens;
                if !totals.agents_involved.iter().any(|a| a == agent) {
                    totals.agents_involved.push(agent.clone());
                }
            }
            LogEvent::ToolCall { .. } | LogEvent::AgentDelegation { .. } => {
                totals.tool_calls += 1;
            }
            _ => {}
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Usage;
    use crate::events::now;

    fn agent_stop(agent: &str, tokens: u64, cost: f64) -> LogEvent {
        let mut usage = Usage::new(tokens, 0);
        usage.total_cost = cost;
        LogEvent::AgentStop {
            timestamp: now(),
            agent: agent.to_string(),
            model: "m".into(),
            content: String::new(),
            tool_calls: vec![],
            finish_reason: "stop".into(),
            usage,
        }
    }

    #[test]
    fn test_aggregate_counts_and_sums() {
        let logs = vec![
            agent_stop("lead", 100, 0.01),
            LogEvent::ToolCall {
                timestamp: now(),
                agent: "lead".into(),
                tool_call_id: "c1".into(),
                tool: "Read".into(),
                arguments: serde_json::json!({}),
            },
            LogEvent::AgentDelegation {
                timestamp: now(),
                agent: "lead".into(),
                tool_call_id: "c2".into(),
                delegate_to: "helper".into(),
                arguments: serde_json::json!({}),
            },
            agent_stop("helper", 50, 0.005),
            agent_stop("lead", 30, 0.002),
        ];

        let totals = aggregate(&logs);
        assert_eq!(totals.llm_requests, 3);
        assert_eq!(totals.total_tokens, 180);
        assert!((totals.total_cost - 0.017).abs() < 1e-9);
        assert_eq!(totals.tool_calls, 2);
        assert_eq!(totals.agents_involved, vec!["lead", "helper"]);
    }

    #[test]
    fn test_aggregate_empty() {
        let totals = aggregate(&[]);
        assert_eq!(totals.llm_requests, 0);
        assert_eq!(totals.tool_calls, 0);
        assert!(totals.agents_involved.is_empty());
    }
}
