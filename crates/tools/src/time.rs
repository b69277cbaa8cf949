//! Current time executor.

use async_trait::async_trait;
use chrono::Utc;
use valet_core::action::Params;
use valet_core::error::ToolError;
use valet_core::tool::{ToolExecutor, ToolName};

pub struct GetTimeTool;

#[async_trait]
impl ToolExecutor for GetTimeTool {
    fn name(&self) -> ToolName {
        ToolName::GetTime
    }

    async fn execute(&self, _params: &Params) -> Result<String, ToolError> {
        Ok(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn formats_as_expected() {
        let tool = GetTimeTool;
        let output = tool.execute(&Params::new()).await.unwrap();
        // "YYYY-MM-DD HH:MM:SS"
        assert_eq!(output.len(), 19);
        assert_eq!(&output[4..5], "-");
        assert_eq!(&output[10..11], " ");
    }
}
