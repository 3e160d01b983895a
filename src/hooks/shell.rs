//! Shell-command hooks for AgentSwarm
//!
//! A shell hook receives the event payload as JSON on stdin and steers
//! through its exit code:
//!
//! - exit 0 — continue; for replace-capable events a non-empty stdout becomes
//!   the replacement value, and on `swarm_stop` it becomes the reprompt
//! - exit 1 — warn and continue
//! - exit 2 — halt, with stderr as the message
//!
//! Environment: `SWARM_PROJECT_DIR` (when the context carries a project
//! directory) alongside the inherited `PATH`. Default timeout 60 seconds.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::warn;

use crate::error::{Result, SwarmError};

use super::{HookContext, HookEvent, HookResult};

/// Default shell hook timeout in seconds.
pub const SHELL_HOOK_TIMEOUT_SECS: u64 = 60;

/// A shell-command hook descriptor.
#[derive(Debug, Clone)]
pub struct ShellHook {
    /// The command run via `sh -c`
    pub command: String,
    /// Wall-clock budget for the subprocess
    pub timeout: Duration,
}

impl ShellHook {
    /// Create a hook with the default timeout.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: Duration::from_secs(SHELL_HOOK_TIMEOUT_SECS),
        }
    }

    /// Override the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the hook against a context and map its exit code to a result.
    pub async fn run(&self, ctx: &HookContext) -> Result<HookResult> {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &ctx.project_dir {
            command.env("SWARM_PROJECT_DIR", dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| SwarmError::Tool(format!("Failed to spawn hook command: {}", e)))?;

        let payload = serde_json::to_vec(&ctx.shell_payload())?;
        let mut stdin = child.stdin.take().expect("piped stdin");
        let mut stdout = child.stdout.take().expect("piped stdout");
        let mut stderr = child.stderr.take().expect("piped stderr");

        let io = async {
            // The hook may exit without reading stdin; ignore write errors.
            let _ = stdin.write_all(&payload).await;
            drop(stdin);
            let mut out = String::new();
            let mut err = String::new();
            let _ = stdout.read_to_string(&mut out).await;
            let _ = stderr.read_to_string(&mut err).await;
            let status = child.wait().await;
            (out, err, status)
        };

        let (out, err, status) = tokio::time::timeout(self.timeout, io)
            .await
            .map_err(|_| {
                SwarmError::Tool(format!(
                    "Hook command timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?;

        let code = status
            .map_err(|e| SwarmError::Tool(format!("Failed to wait for hook: {}", e)))?
            .code()
            .unwrap_or(-1);

        match code {
            0 => {
                let stdout = out.trim();
                if stdout.is_empty() {
                    Ok(HookResult::Continue)
                } else if ctx.event == HookEvent::SwarmStop {
                    Ok(HookResult::Reprompt(stdout.to_string()))
                } else if ctx.event.supports_replace() {
                    Ok(HookResult::Replace(stdout.to_string()))
                } else {
                    Ok(HookResult::Continue)
                }
            }
            2 => Ok(HookResult::Halt(err.trim().to_string())),
            other => {
                warn!(
                    command = %self.command,
                    code = other,
                    stderr = %err.trim(),
                    "Hook command exited non-blocking"
                );
                Ok(HookResult::Continue)
            }
        }
    }
}
