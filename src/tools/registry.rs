//! Tool registry for AgentSwarm
//!
//! Holds one agent's tool set with insertion-order iteration, name lookup,
//! and LLM-facing schema extraction.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::driver::ToolSchema;

use super::{schema_of, Tool};

/// A registry that holds one agent's tools.
///
/// Registration order is preserved: the schemas advertised to the LLM appear
/// in the order tools were registered. Registering a tool under an existing
/// name replaces it without changing its position.
pub struct ToolRegistry {
    order: Vec<String>,
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        info!(tool = %name, "Registering tool");
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool exists in the registry.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all registered tools, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// LLM-facing schemas for all tools, in registration order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| schema_of(tool.as_ref()))
            .collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ThinkTool;

    #[test]
    fn test_registry_new() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ThinkTool));

        assert!(registry.has("Think"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Think").unwrap().name(), "Think");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_registry_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        for tool in crate::tools::default_tools() {
            registry.register(tool);
        }
        let names = registry.names();
        assert_eq!(names[0], "Read");
        assert_eq!(names[1], "Write");
        let schemas = registry.schemas();
        assert_eq!(schemas[0].name, "Read");
        assert_eq!(schemas.len(), names.len());
    }

    #[test]
    fn test_registry_replace_keeps_position() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(ThinkTool));
        registry.register(Arc::new(crate::tools::ReadTool));
        registry.register(Arc::new(ThinkTool));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["Think", "Read"]);
    }
}
