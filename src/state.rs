//! Shared in-process state for AgentSwarm
//!
//! Three small stores back the built-in tools:
//!
//! - [`ReadTracker`] — per-agent set of canonical paths read so far; `Write`
//!   and `Edit` on an existing file require a prior `Read` by the same agent.
//! - [`TodoStore`] — per-agent todo lists replaced wholesale by `TodoWrite`.
//! - [`Scratchpad`] — session-scoped hierarchical KV shared by every agent in
//!   the swarm, with per-entry and total size caps.
//!
//! All three use plain `std::sync::Mutex` internals: no lock is ever held
//! across an await point.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Maximum size of a single scratchpad entry (1 MB).
pub const SCRATCHPAD_MAX_ENTRY_BYTES: usize = 1024 * 1024;
/// Maximum total scratchpad size (100 MB).
pub const SCRATCHPAD_MAX_TOTAL_BYTES: usize = 100 * 1024 * 1024;

/// Per-agent record of files read during this swarm's lifetime.
#[derive(Default)]
pub struct ReadTracker {
    inner: Mutex<HashMap<String, HashSet<PathBuf>>>,
}

impl ReadTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `agent` has read the canonical `path`.
    pub fn record(&self, agent: &str, path: &Path) {
        self.inner
            .lock()
            .expect("read tracker lock")
            .entry(agent.to_string())
            .or_default()
            .insert(path.to_path_buf());
    }

    /// Whether `agent` has read the canonical `path`.
    pub fn has_read(&self, agent: &str, path: &Path) -> bool {
        self.inner
            .lock()
            .expect("read tracker lock")
            .get(agent)
            .is_some_and(|set| set.contains(path))
    }
}

/// Status of one todo item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

/// One entry in an agent's todo list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    /// What needs to be done
    pub content: String,
    /// Current status
    pub status: TodoStatus,
    /// Present-continuous form shown while the item is in progress
    #[serde(rename = "activeForm")]
    pub active_form: String,
}

/// Per-agent todo lists.
#[derive(Default)]
pub struct TodoStore {
    inner: Mutex<HashMap<String, Vec<TodoItem>>>,
}

impl TodoStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `agent`'s list with `items`.
    pub fn replace(&self, agent: &str, items: Vec<TodoItem>) {
        self.inner
            .lock()
            .expect("todo store lock")
            .insert(agent.to_string(), items);
    }

    /// Current list for `agent` (empty if never written).
    pub fn get(&self, agent: &str) -> Vec<TodoItem> {
        self.inner
            .lock()
            .expect("todo store lock")
            .get(agent)
            .cloned()
            .unwrap_or_default()
    }
}

/// One scratchpad entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchpadEntry {
    /// Entry body
    pub content: String,
    /// Short human-readable title shown in listings
    pub title: String,
}

/// Session-scoped hierarchical key-value store shared across the swarm.
///
/// Keys are slash-separated paths ("research/findings"). Writes are
/// last-writer-wins per key; there are no cross-key invariants, so one lock
/// over the map suffices.
#[derive(Default)]
pub struct Scratchpad {
    entries: Mutex<BTreeMap<String, ScratchpadEntry>>,
}

impl Scratchpad {
    /// Create an empty scratchpad.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write an entry, enforcing the per-entry and total size caps.
    pub fn write(&self, path: &str, content: &str, title: &str) -> Result<(), String> {
        if path.trim().is_empty() {
            return Err("Scratchpad path must not be empty".to_string());
        }
        if content.len() > SCRATCHPAD_MAX_ENTRY_BYTES {
            return Err(format!(
                "Scratchpad entry exceeds {} byte limit ({} bytes)",
                SCRATCHPAD_MAX_ENTRY_BYTES,
                content.len()
            ));
        }
        let mut entries = self.entries.lock().expect("scratchpad lock");
        let existing = entries.get(path).map(|e| e.content.len()).unwrap_or(0);
        let total: usize = entries.values().map(|e| e.content.len()).sum();
        if total - existing + content.len() > SCRATCHPAD_MAX_TOTAL_BYTES {
            return Err(format!(
                "Scratchpad total size would exceed {} byte limit",
                SCRATCHPAD_MAX_TOTAL_BYTES
            ));
        }
        entries.insert(
            path.to_string(),
            ScratchpadEntry {
                content: content.to_string(),
                title: title.to_string(),
            },
        );
        Ok(())
    }

    /// Read an entry.
    pub fn read(&self, path: &str) -> Option<ScratchpadEntry> {
        self.entries.lock().expect("scratchpad lock").get(path).cloned()
    }

    /// List entries, optionally under a path prefix. Returns (path, title)
    /// pairs in key order.
    pub fn list(&self, prefix: Option<&str>) -> Vec<(String, String)> {
        let entries = self.entries.lock().expect("scratchpad lock");
        entries
            .iter()
            .filter(|(path, _)| prefix.map_or(true, |p| path.starts_with(p)))
            .map(|(path, entry)| (path.clone(), entry.title.clone()))
            .collect()
    }

    /// Whether the scratchpad has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().expect("scratchpad lock").is_empty()
    }
}
