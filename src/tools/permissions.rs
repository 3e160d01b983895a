//! Permission rule sets for AgentSwarm tools
//!
//! Each tool may carry `{allowed_paths, denied_paths}` glob rules. The
//! effective decision for a candidate path:
//!
//! 1. Resolve relative to the agent directory, canonicalize.
//! 2. Any denied pattern matching → **deny**.
//! 3. Empty allow list → **allow**.
//! 4. Any allowed pattern matching → **allow**; otherwise **deny**.
//!
//! Glob syntax: `*` (not crossing `/`), `**`, `?`, `[set]`, `{a,b}`.
//!
//! [`PermissionedTool`] wraps any tool whose first path-like argument
//! (`file_path`, then `path`) falls under a rule set. Directory-scoped tools
//! (Grep/Glob) are checked on their root argument and their output lines are
//! post-filtered to allowed paths.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SwarmError};

use super::{Tool, ToolContext};

/// Allow/deny glob rules for one tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPermissions {
    /// Paths the tool may touch. Empty = allow everything not denied.
    pub allowed_paths: Vec<String>,
    /// Paths the tool must never touch. Deny wins over allow.
    pub denied_paths: Vec<String>,
}

impl ToolPermissions {
    /// Rules allowing only the given globs.
    pub fn allow(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            allowed_paths: paths.into_iter().map(Into::into).collect(),
            denied_paths: Vec::new(),
        }
    }

    /// Rules denying the given globs on top of the current allow list.
    pub fn deny(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.denied_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Compile the rule set. Fails on malformed glob patterns.
    pub fn compile(&self) -> Result<CompiledPermissions> {
        Ok(CompiledPermissions {
            allowed: build_set(&self.allowed_paths)?,
            denied: build_set(&self.denied_paths)?,
            allowed_raw: self.allowed_paths.clone(),
        })
    }
}

fn build_set(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| SwarmError::Config(format!("Invalid glob pattern '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| SwarmError::Config(format!("Invalid glob set: {}", e)))
}

/// Compiled allow/deny rule set.
#[derive(Clone)]
pub struct CompiledPermissions {
    allowed: Option<GlobSet>,
    denied: Option<GlobSet>,
    allowed_raw: Vec<String>,
}

impl CompiledPermissions {
    /// Decide whether `path` (already canonical) is permitted for an agent
    /// rooted at `directory`. Patterns match against the path relative to the
    /// agent directory, falling back to the absolute path for absolute
    /// patterns.
    pub fn permits(&self, path: &Path, directory: &Path) -> bool {
        let relative = path.strip_prefix(directory).unwrap_or(path);
        let matches = |set: &GlobSet| set.is_match(relative) || set.is_match(path);
        if let Some(denied) = &self.denied {
            if matches(denied) {
                return false;
            }
        }
        match &self.allowed {
            None => true,
            Some(allowed) => matches(allowed),
        }
    }

    /// The configured allow globs, for denial messages.
    pub fn allowed_globs(&self) -> &[String] {
        &self.allowed_raw
    }
}

/// Decorator enforcing a permission rule set around an inner tool.
pub struct PermissionedTool {
    inner: Arc<dyn Tool>,
    rules: CompiledPermissions,
    description: String,
}

impl PermissionedTool {
    /// Wrap `inner` with the given rules.
    pub fn new(inner: Arc<dyn Tool>, permissions: &ToolPermissions) -> Result<Self> {
        let description = inner.description().to_string();
        Ok(Self {
            inner,
            rules: permissions.compile()?,
            description,
        })
    }

    fn is_directory_scoped(&self) -> bool {
        matches!(self.inner.name(), "Grep" | "Glob")
    }

    /// Extract the first path-like argument of a call.
    fn path_argument(args: &Value) -> Option<&str> {
        args.get("file_path")
            .or_else(|| args.get("path"))
            .and_then(|v| v.as_str())
    }

    fn check(&self, raw: &str, ctx: &ToolContext) -> Result<()> {
        // Canonicalize as far as the filesystem allows: a write target may not
        // exist yet, so fall back to the joined path for the rule check.
        let joined = if Path::new(raw).is_absolute() {
            std::path::PathBuf::from(raw)
        } else {
            ctx.directory().join(raw)
        };
        let candidate = joined.canonicalize().unwrap_or(joined);
        if self.rules.permits(&candidate, ctx.directory()) {
            Ok(())
        } else {
            Err(SwarmError::PermissionDenied {
                path: candidate.display().to_string(),
                allowed: self.rules.allowed_globs().to_vec(),
            })
        }
    }

    /// Remove output lines naming paths outside the rule set. Lines that do
    /// not look like paths are kept.
    fn post_filter(&self, output: String, ctx: &ToolContext) -> String {
        output
            .lines()
            .filter(|line| {
                // Grep content lines are "path:rest"; Glob lines are bare paths.
                let candidate = line.split(':').next().unwrap_or(line).trim();
                if candidate.is_empty() {
                    return true;
                }
                let path = Path::new(candidate);
                if !path.exists() {
                    return true;
                }
                let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
                self.rules.permits(&canonical, ctx.directory())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Tool for PermissionedTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.inner.parameters()
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        if let Some(raw) = Self::path_argument(&args) {
            self.check(raw, ctx)?;
        }
        let output = self.inner.invoke(args, ctx).await?;
        if self.is_directory_scoped() {
            Ok(self.post_filter(output, ctx))
        } else {
            Ok(output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ReadTool, WriteTool};
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_decision_order_deny_wins() {
        let rules = ToolPermissions {
            allowed_paths: vec!["src/**".to_string()],
            denied_paths: vec!["src/secret/**".to_string()],
        }
        .compile()
        .unwrap();
        let dir = Path::new("/work");

        assert!(rules.permits(Path::new("/work/src/main.rs"), dir));
        assert!(!rules.permits(Path::new("/work/src/secret/key.pem"), dir));
        assert!(!rules.permits(Path::new("/work/docs/readme.md"), dir));
    }

    #[test]
    fn test_empty_allow_list_allows() {
        let rules = ToolPermissions::default().compile().unwrap();
        assert!(rules.permits(Path::new("/anywhere/at/all"), Path::new("/work")));
    }

    #[test]
    fn test_brace_alternation_and_question_mark() {
        let rules = ToolPermissions {
            allowed_paths: vec!["src/*.{rs,toml}".to_string(), "logs/day-?.txt".to_string()],
            denied_paths: vec![],
        }
        .compile()
        .unwrap();
        let dir = Path::new("/w");

        assert!(rules.permits(Path::new("/w/src/lib.rs"), dir));
        assert!(rules.permits(Path::new("/w/src/Cargo.toml"), dir));
        assert!(!rules.permits(Path::new("/w/src/notes.md"), dir));
        assert!(rules.permits(Path::new("/w/logs/day-1.txt"), dir));
        assert!(!rules.permits(Path::new("/w/logs/day-10.txt"), dir));
    }

    #[test]
    fn test_single_star_does_not_cross_separator() {
        let rules = ToolPermissions {
            allowed_paths: vec!["src/*".to_string()],
            denied_paths: vec![],
        }
        .compile()
        .unwrap();
        let dir = Path::new("/w");

        assert!(rules.permits(Path::new("/w/src/a.rs"), dir));
        assert!(!rules.permits(Path::new("/w/src/nested/a.rs"), dir));
    }

    #[tokio::test]
    async fn test_denied_write_names_path_and_globs() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("secrets")).unwrap();
        let ctx = ToolContext::new("alpha", dir.path().canonicalize().unwrap());

        let tool = PermissionedTool::new(
            Arc::new(WriteTool),
            &ToolPermissions::allow(["src/**"]),
        )
        .unwrap();

        let err = tool
            .invoke(json!({"file_path": "secrets/x.pem", "content": "k"}), &ctx)
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("x.pem"), "missing path in: {}", msg);
        assert!(msg.contains("src/**"), "missing globs in: {}", msg);
    }

    #[tokio::test]
    async fn test_allowed_write_passes_through() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        let ctx = ToolContext::new("alpha", dir.path().canonicalize().unwrap());

        let tool = PermissionedTool::new(
            Arc::new(WriteTool),
            &ToolPermissions::allow(["src/**"]),
        )
        .unwrap();

        let result = tool
            .invoke(json!({"file_path": "src/a.rb", "content": "puts 1"}), &ctx)
            .await;
        assert!(result.is_ok(), "{:?}", result.err());
    }

    #[tokio::test]
    async fn test_read_denied_by_deny_list() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("blocked.txt"), "x").unwrap();
        let ctx = ToolContext::new("alpha", dir.path().canonicalize().unwrap());

        let tool = PermissionedTool::new(
            Arc::new(ReadTool),
            &ToolPermissions::default().deny(["blocked.txt"]),
        )
        .unwrap();

        let err = tool
            .invoke(json!({"file_path": "blocked.txt"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, SwarmError::PermissionDenied { .. }));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let perms = ToolPermissions::allow(["src/[".to_string()]);
        assert!(matches!(perms.compile(), Err(SwarmError::Config(_))));
    }
}
