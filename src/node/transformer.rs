//! Node transformers for AgentSwarm workflows
//!
//! A transformer rewrites a node's input before its sub-swarm runs, or its
//! output afterwards, and can skip the node or halt the whole workflow. It is
//! either an in-process block or a shell command:
//!
//! - block: returns a [`TransformerOutcome`] directly
//! - command: receives the context as JSON on stdin; exit 0 makes stdout the
//!   new content, exit 1 skips the node (stdout as the node content when
//!   non-empty), exit 2 halts the workflow with stderr as the message. The
//!   subprocess gets `SWARM_NODE_NAME` and, when the node has agents,
//!   `SWARM_PROJECT_DIR` (the lead agent's directory)

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::error::{Result, SwarmError};

use super::NodeResult;

/// Default command transformer timeout in seconds.
pub const TRANSFORMER_TIMEOUT_SECS: u64 = 60;

/// What a transformer sees.
#[derive(Debug, Clone)]
pub struct TransformerContext {
    /// The node being transformed
    pub node: String,
    /// Current content (previous node's output, or the original prompt)
    pub content: String,
    /// The workflow's original prompt
    pub original_prompt: String,
    /// Names of the node's dependencies
    pub dependencies: Vec<String>,
    /// Results of every node finished so far
    pub all_results: HashMap<String, NodeResult>,
    /// The node's lead agent directory, exported to shell transformers as
    /// SWARM_PROJECT_DIR (absent for agent-less nodes)
    pub project_dir: Option<PathBuf>,
}

impl TransformerContext {
    fn payload(&self) -> serde_json::Value {
        json!({
            "node": self.node,
            "content": self.content,
            "original_prompt": self.original_prompt,
            "dependencies": self.dependencies,
            "all_results": self.all_results,
        })
    }
}

/// What a transformer decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformerOutcome {
    /// New content; execution proceeds
    Content(String),
    /// Skip the node's sub-swarm; the content becomes the node result
    Skip {
        /// The node result content
        content: String,
    },
    /// Halt the whole workflow
    Halt(String),
}

/// Block transformer signature.
pub type BlockTransformer =
    Arc<dyn Fn(&TransformerContext) -> TransformerOutcome + Send + Sync>;

/// A node input/output transformer.
#[derive(Clone)]
pub enum Transformer {
    /// In-process block
    Block(BlockTransformer),
    /// Shell command following the exit-code protocol
    Command {
        /// The command run via `sh -c`
        command: String,
        /// Wall-clock budget for the subprocess
        timeout: Duration,
    },
}

impl Transformer {
    /// A block transformer.
    pub fn block<F>(f: F) -> Self
    where
        F: Fn(&TransformerContext) -> TransformerOutcome + Send + Sync + 'static,
    {
        Transformer::Block(Arc::new(f))
    }

    /// A command transformer with the default timeout.
    pub fn command(command: impl Into<String>) -> Self {
        Transformer::Command {
            command: command.into(),
            timeout: Duration::from_secs(TRANSFORMER_TIMEOUT_SECS),
        }
    }

    /// Apply the transformer to a context.
    pub async fn apply(&self, ctx: &TransformerContext) -> Result<TransformerOutcome> {
        match self {
            Transformer::Block(f) => Ok(f(ctx)),
            Transformer::Command { command, timeout } => {
                run_command(command, *timeout, ctx).await
            }
        }
    }
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transformer::Block(_) => f.write_str("Transformer::Block"),
            Transformer::Command { command, .. } => {
                write!(f, "Transformer::Command({})", command)
            }
        }
    }
}

async fn run_command(
    command: &str,
    timeout: Duration,
    ctx: &TransformerContext,
) -> Result<TransformerOutcome> {
    let mut spawned = Command::new("sh");
    spawned
        .arg("-c")
        .arg(command)
        .env("SWARM_NODE_NAME", &ctx.node)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &ctx.project_dir {
        spawned.env("SWARM_PROJECT_DIR", dir);
    }
    let mut child = spawned
        .spawn()
        .map_err(|e| SwarmError::Tool(format!("Failed to spawn transformer: {}", e)))?;

    let payload = serde_json::to_vec(&ctx.payload())?;
    let mut stdin = child.stdin.take().expect("piped stdin");
    let mut stdout = child.stdout.take().expect("piped stdout");
    let mut stderr = child.stderr.take().expect("piped stderr");

    let io = async {
        let _ = stdin.write_all(&payload).await;
        drop(stdin);
        let mut out = String::new();
        let mut err = String::new();
        let _ = stdout.read_to_string(&mut out).await;
        let _ = stderr.read_to_string(&mut err).await;
        let status = child.wait().await;
        (out, err, status)
    };

    let (out, err, status) = tokio::time::timeout(timeout, io).await.map_err(|_| {
        SwarmError::Tool(format!(
            "Transformer timed out after {}s",
            timeout.as_secs()
        ))
    })?;

    let code = status
        .map_err(|e| SwarmError::Tool(format!("Failed to wait for transformer: {}", e)))?
        .code()
        .unwrap_or(-1);

    match code {
        0 => Ok(TransformerOutcome::Content(out.trim_end().to_string())),
        1 => {
            let stdout = out.trim_end();
            Ok(TransformerOutcome::Skip {
                content: if stdout.is_empty() {
                    ctx.content.clone()
                } else {
                    stdout.to_string()
                },
            })
        }
        2 => Ok(TransformerOutcome::Halt(err.trim().to_string())),
        other => Err(SwarmError::Tool(format!(
            "Transformer exited with unexpected status {}: {}",
            other,
            err.trim()
        ))),
    }
}
