//! Context accounting for AgentSwarm agents
//!
//! Tracks cumulative token usage against an agent's context window and
//! latches the 80/90 percent warning thresholds so each fires exactly once
//! per agent lifetime (reprompts preserve both counters and latches).

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::driver::Usage;

/// Warning thresholds as percentages of the context window.
pub const WARNING_THRESHOLDS: [u8; 2] = [80, 90];

/// Details of one threshold crossing.
#[derive(Debug, Clone)]
pub struct ContextWarning {
    /// The threshold crossed (80 or 90)
    pub threshold: u8,
    /// Current usage percentage
    pub current_usage: f64,
    /// Cumulative tokens used
    pub tokens_used: u64,
    /// Tokens remaining before the window is full
    pub tokens_remaining: u64,
    /// The context window size
    pub context_limit: u64,
}

/// Cumulative token counters for one agent.
pub struct ContextTracker {
    context_window: u64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    hit_thresholds: Mutex<HashSet<u8>>,
}

impl ContextTracker {
    /// Create a tracker for the given context window.
    pub fn new(context_window: u64) -> Self {
        Self {
            context_window: context_window.max(1),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            hit_thresholds: Mutex::new(HashSet::new()),
        }
    }

    /// Record usage from one completion and return warnings for thresholds
    /// crossed for the first time, in ascending order.
    pub fn record(&self, usage: &Usage) -> Vec<ContextWarning> {
        self.input_tokens.fetch_add(usage.input_tokens, Ordering::SeqCst);
        self.output_tokens.fetch_add(usage.output_tokens, Ordering::SeqCst);

        let used = self.total_tokens();
        let percent = used as f64 / self.context_window as f64 * 100.0;

        let mut hit = self.hit_thresholds.lock().expect("threshold lock");
        WARNING_THRESHOLDS
            .iter()
            .filter(|&&threshold| percent >= threshold as f64 && hit.insert(threshold))
            .map(|&threshold| ContextWarning {
                threshold,
                current_usage: percent,
                tokens_used: used,
                tokens_remaining: self.context_window.saturating_sub(used),
                context_limit: self.context_window,
            })
            .collect()
    }

    /// Cumulative input tokens.
    pub fn input_tokens(&self) -> u64 {
        self.input_tokens.load(Ordering::SeqCst)
    }

    /// Cumulative output tokens.
    pub fn output_tokens(&self) -> u64 {
        self.output_tokens.load(Ordering::SeqCst)
    }

    /// Cumulative total tokens.
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens() + self.output_tokens()
    }

    /// The context window size.
    pub fn context_window(&self) -> u64 {
        self.context_window
    }
}
