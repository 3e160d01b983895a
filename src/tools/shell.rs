//! Shell tool for AgentSwarm
//!
//! Executes a shell command in the calling agent's directory via `sh -c`,
//! returning combined stdout/stderr prefixed by the exit code. The timeout
//! defaults to 120 seconds and is clamped to 600; a timed-out command yields
//! the error string `Error: Command timed out after Ns` as tool content, not
//! a swarm failure.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::error::{Result, SwarmError};

use super::{Tool, ToolContext};

/// Default command timeout in seconds.
pub const BASH_DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Maximum command timeout in seconds.
pub const BASH_MAX_TIMEOUT_SECS: u64 = 600;

/// Tool for executing shell commands.
pub struct BashTool;

impl BashTool {
    /// Create a new shell tool.
    pub fn new() -> Self {
        Self
    }
}

impl Default for BashTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "Bash"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the agent's directory and return its exit code and combined output"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds (default 120, max 600)"
                }
            },
            "required": ["command"]
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SwarmError::Tool("Missing 'command' argument".into()))?;

        let timeout_secs = args
            .get("timeout")
            .and_then(|v| v.as_u64())
            .unwrap_or(BASH_DEFAULT_TIMEOUT_SECS)
            .min(BASH_MAX_TIMEOUT_SECS);

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(ctx.directory())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SwarmError::Tool(format!("Failed to spawn command: {}", e)))?;

        let mut stdout = child.stdout.take().expect("piped stdout");
        let mut stderr = child.stderr.take().expect("piped stderr");

        let gather = async {
            let mut out = String::new();
            let mut err = String::new();
            let _ = stdout.read_to_string(&mut out).await;
            let _ = stderr.read_to_string(&mut err).await;
            let status = child.wait().await;
            (out, err, status)
        };

        let cancelled = ctx.cancel().clone();
        let result = tokio::select! {
            _ = cancelled.cancelled() => {
                return Err(SwarmError::Cancelled);
            }
            result = tokio::time::timeout(Duration::from_secs(timeout_secs), gather) => result,
        };

        match result {
            Ok((out, err, status)) => {
                let code = status
                    .map_err(|e| SwarmError::Tool(format!("Failed to wait for command: {}", e)))?
                    .code()
                    .unwrap_or(-1);
                let mut combined = out;
                if !err.is_empty() {
                    if !combined.is_empty() && !combined.ends_with('\n') {
                        combined.push('\n');
                    }
                    combined.push_str(&err);
                }
                Ok(format!("Exit code: {}\n{}", code, combined))
            }
            Err(_) => Err(SwarmError::Tool(format!(
                "Error: Command timed out after {}s",
                timeout_secs
            ))),
        }
    }
}
