//! Shell command executor.
//!
//! Runs the command through the platform shell with a hard timeout and
//! returns stdout/stderr. Dangerous-substring screening happens upstream
//! in the action validator, before dispatch.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};
use valet_core::action::Params;
use valet_core::error::ToolError;
use valet_core::tool::{ToolExecutor, ToolName};

pub struct CommandTool {
    timeout_secs: u64,
}

impl CommandTool {
    pub fn new() -> Self {
        Self { timeout_secs: 30 }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for CommandTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for CommandTool {
    fn name(&self) -> ToolName {
        ToolName::Command
    }

    async fn execute(&self, params: &Params) -> Result<String, ToolError> {
        let command = params
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        debug!(command = %command, "Executing shell command");

        let run = async {
            if cfg!(target_os = "windows") {
                Command::new("cmd").args(["/C", command]).output().await
            } else {
                Command::new("sh").args(["-c", command]).output().await
            }
        };

        let output = tokio::time::timeout(
            std::time::Duration::from_secs(self.timeout_secs),
            run,
        )
        .await
        .map_err(|_| ToolError::Timeout {
            tool_name: "command".into(),
            timeout_secs: self.timeout_secs,
        })?
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: "command".into(),
            reason: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let result_text = if output.status.success() {
            if stderr.is_empty() {
                stdout
            } else {
                format!("{stdout}\n[stderr]: {stderr}")
            }
        } else {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %command, exit_code = code, "Command failed");
            format!("[exit code: {code}]\n{stdout}\n{stderr}")
        };

        Ok(result_text.trim().to_string())
    }
}
