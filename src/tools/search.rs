//! Search tools for AgentSwarm
//!
//! Grep (recursive regex match) and Glob (pattern match) rooted at a `path`
//! argument resolved against the agent's directory. Both refuse an empty or
//! missing path.

use async_trait::async_trait;
use globset::GlobBuilder;
use regex::RegexBuilder;
use serde_json::{json, Value};
use walkdir::WalkDir;

use crate::error::{Result, SwarmError};

use super::{resolve_existing, Tool, ToolContext};

/// Tool for recursive regex search.
///
/// Output modes:
/// - `content` (default): `path:line_number:line` for each match
/// - `files_with_matches`: matching file paths, one per line
/// - `count`: `path:count` for each file with at least one match
pub struct GrepTool;

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "Grep"
    }

    fn description(&self) -> &str {
        "Search file contents under a directory with a regular expression"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "The regular expression to search for"
                },
                "path": {
                    "type": "string",
                    "description": "Directory to search in"
                },
                "case_insensitive": {
                    "type": "boolean",
                    "description": "Match case-insensitively"
                },
                "output_mode": {
                    "type": "string",
                    "enum": ["content", "files_with_matches", "count"],
                    "description": "What to report per match (default: content)"
                }
            },
            "required": ["pattern", "path"]
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let pattern = args
            .get("pattern")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'pattern' argument".into()))?;
        let raw_path = args
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'path' argument".into()))?;
        let case_insensitive = args
            .get("case_insensitive")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let output_mode = args
            .get("output_mode")
            .and_then(|v| v.as_str())
            .unwrap_or("content");

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| SwarmError::Tool(format!("Invalid regex '{}': {}", pattern, e)))?;

        let root = resolve_existing(raw_path, ctx)?;

        let mut lines = Vec::new();
        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                continue; // binary or unreadable
            };
            let mut match_count = 0usize;
            for (number, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    match_count += 1;
                    if output_mode == "content" {
                        lines.push(format!(
                            "{}:{}:{}",
                            entry.path().display(),
                            number + 1,
                            line
                        ));
                    }
                }
            }
            if match_count > 0 {
                match output_mode {
                    "files_with_matches" => lines.push(entry.path().display().to_string()),
                    "count" => lines.push(format!("{}:{}", entry.path().display(), match_count)),
                    _ => {}
                }
            }
        }

        if lines.is_empty() {
            Ok("No matches found".to_string())
        } else {
            Ok(lines.join("\n"))
        }
    }
}

/// Tool for glob matching rooted at a directory.
pub struct GlobTool;

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "Glob"
    }

    fn description(&self) -> &str {
        "Find files matching a glob pattern under a directory"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern, e.g. '**/*.rs'"
                },
                "path": {
                    "type": "string",
                    "description": "Directory the pattern is rooted at"
                }
            },
            "required": ["pattern", "path"]
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let pattern = args
            .get("pattern")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'pattern' argument".into()))?;
        let raw_path = args
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'path' argument".into()))?;

        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| SwarmError::Tool(format!("Invalid glob '{}': {}", pattern, e)))?
            .compile_matcher();

        let root = resolve_existing(raw_path, ctx)?;

        let mut matches = Vec::new();
        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            if glob.is_match(relative) {
                matches.push(entry.path().display().to_string());
            }
        }

        if matches.is_empty() {
            Ok("No files found".to_string())
        } else {
            Ok(matches.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn fixture() -> (tempfile::TempDir, ToolContext) {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}\nlet x = 1;\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "plain text\nMAIN event\n").unwrap();
        std::fs::write(dir.path().join("sub/c.rs"), "fn main() {}\n").unwrap();
        let ctx = ToolContext::new("alpha", dir.path().canonicalize().unwrap());
        (dir, ctx)
    }

    #[tokio::test]
    async fn test_grep_content_mode() {
        let (_dir, ctx) = fixture();
        let out = GrepTool
            .invoke(json!({"pattern": "fn main", "path": "."}), &ctx)
            .await
            .unwrap();
        assert!(out.contains("a.rs:1:fn main() {}"));
        assert!(out.contains("c.rs:1:fn main() {}"));
        assert!(!out.contains("b.txt"));
    }

    #[tokio::test]
    async fn test_grep_files_with_matches() {
        let (_dir, ctx) = fixture();
        let out = GrepTool
            .invoke(
                json!({"pattern": "fn main", "path": ".", "output_mode": "files_with_matches"}),
                &ctx,
            )
            .await
            .unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.ends_with(".rs")));
    }

    #[tokio::test]
    async fn test_grep_count_mode() {
        let (_dir, ctx) = fixture();
        let out = GrepTool
            .invoke(
                json!({"pattern": "main", "path": ".", "case_insensitive": true, "output_mode": "count"}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(out.contains("b.txt:1"));
    }

    #[tokio::test]
    async fn test_grep_case_insensitive() {
        let (_dir, ctx) = fixture();
        let out = GrepTool
            .invoke(
                json!({"pattern": "main event", "path": ".", "case_insensitive": true}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(out.contains("MAIN event"));
    }

    #[tokio::test]
    async fn test_grep_refuses_empty_path() {
        let (_dir, ctx) = fixture();
        let err = GrepTool
            .invoke(json!({"pattern": "x", "path": ""}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn test_grep_no_matches() {
        let (_dir, ctx) = fixture();
        let out = GrepTool
            .invoke(json!({"pattern": "zzz_nothing", "path": "."}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "No matches found");
    }

    #[tokio::test]
    async fn test_glob_recursive_pattern() {
        let (_dir, ctx) = fixture();
        let out = GlobTool
            .invoke(json!({"pattern": "**/*.rs", "path": "."}), &ctx)
            .await
            .unwrap();
        assert!(out.contains("a.rs"));
        assert!(out.contains("c.rs"));
        assert!(!out.contains("b.txt"));
    }

    #[tokio::test]
    async fn test_glob_single_level() {
        let (_dir, ctx) = fixture();
        let out = GlobTool
            .invoke(json!({"pattern": "*.rs", "path": "."}), &ctx)
            .await
            .unwrap();
        assert!(out.contains("a.rs"));
        assert!(!out.contains("c.rs"), "single star must not recurse: {}", out);
    }

    #[tokio::test]
    async fn test_glob_missing_path_argument() {
        let (_dir, ctx) = fixture();
        let err = GlobTool
            .invoke(json!({"pattern": "*.rs"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Missing 'path'"));
    }

    #[tokio::test]
    async fn test_glob_results_are_absolute() {
        let (_dir, ctx) = fixture();
        let out = GlobTool
            .invoke(json!({"pattern": "*.txt", "path": "."}), &ctx)
            .await
            .unwrap();
        for line in out.lines() {
            assert!(Path::new(line).is_absolute());
        }
    }
}
