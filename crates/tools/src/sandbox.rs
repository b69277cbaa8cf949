//! Sandboxed code executor.
//!
//! Runs a Python snippet in a subprocess with a hard timeout. A real
//! deployment would point this at an isolated runner; the interface the
//! loop depends on is just code in, text out.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use valet_core::action::Params;
use valet_core::error::ToolError;
use valet_core::tool::{ToolExecutor, ToolName};

pub struct SandboxTool {
    interpreter: String,
    timeout_secs: u64,
}

impl SandboxTool {
    pub fn new() -> Self {
        Self {
            interpreter: "python3".into(),
            timeout_secs: 30,
        }
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.interpreter = interpreter.into();
        self
    }
}

impl Default for SandboxTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for SandboxTool {
    fn name(&self) -> ToolName {
        ToolName::Sandbox
    }

    async fn execute(&self, params: &Params) -> Result<String, ToolError> {
        let code = params
            .get("code")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'code' argument".into()))?;

        debug!(bytes = code.len(), "Executing sandboxed code");

        let run = async { Command::new(&self.interpreter).args(["-c", code]).output().await };
        let output = tokio::time::timeout(
            std::time::Duration::from_secs(self.timeout_secs),
            run,
        )
        .await
        .map_err(|_| ToolError::Timeout {
            tool_name: "sandbox".into(),
            timeout_secs: self.timeout_secs,
        })?
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: "sandbox".into(),
            reason: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            return Err(ToolError::ExecutionFailed {
                tool_name: "sandbox".into(),
                reason: if stderr.is_empty() { stdout } else { stderr },
            });
        }

        let result = if stderr.is_empty() {
            stdout
        } else {
            format!("{stdout}\n[stderr]: {stderr}")
        };
        Ok(result.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Params {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn executes_print() {
        let tool = SandboxTool::new();
        let output = tool
            .execute(&params(json!({"code": "print(2 + 3)"})))
            .await
            .unwrap();
        assert_eq!(output, "5");
    }

    #[tokio::test]
    async fn syntax_error_is_execution_failure() {
        let tool = SandboxTool::new();
        let result = tool
            .execute(&params(json!({"code": "def broken("})))
            .await;
        assert!(matches!(result, Err(ToolError::ExecutionFailed { .. })));
    }

    #[tokio::test]
    async fn missing_code_is_error() {
        let tool = SandboxTool::new();
        let result = tool.execute(&Params::new()).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
