//! Hook registries for AgentSwarm
//!
//! A registry holds an ordered list of registrations and freezes when swarm
//! execution begins: registering afterwards is a `State` error. The swarm
//! owns one default registry plus one per agent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::error::{Result, SwarmError};

use super::{HookEvent, HookRegistration};

/// An ordered, freezable collection of hook registrations.
pub struct HookRegistry {
    entries: RwLock<Vec<HookRegistration>>,
    frozen: AtomicBool,
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            frozen: AtomicBool::new(false),
        }
    }

    /// Add a registration. Fails once the registry is frozen.
    pub fn register(&self, registration: HookRegistration) -> Result<()> {
        if self.frozen.load(Ordering::SeqCst) {
            return Err(SwarmError::State(
                "hook registrations are frozen once execution has started".to_string(),
            ));
        }
        self.entries.write().expect("hook lock").push(registration);
        Ok(())
    }

    /// Freeze the registry. Idempotent.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::SeqCst);
    }

    /// Whether the registry is frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::SeqCst)
    }

    /// Registrations matching `event` and `target`, in registration order.
    pub fn matching(&self, event: HookEvent, target: Option<&str>) -> Vec<HookRegistration> {
        self.entries
            .read()
            .expect("hook lock")
            .iter()
            .filter(|r| r.event == event)
            .filter(|r| r.matcher.as_ref().map_or(true, |m| m.matches(target)))
            .cloned()
            .collect()
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.read().expect("hook lock").len()
    }

    /// Whether the registry has no registrations.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
