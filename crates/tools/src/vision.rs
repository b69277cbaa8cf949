//! Vision analysis executor: deterministic stand-in for a vision model.
//!
//! Accepts either an image path or an image URL plus an optional prompt.
//! The description it returns is what the dispatcher offers to long-term
//! memory.

use async_trait::async_trait;
use valet_core::action::Params;
use valet_core::error::ToolError;
use valet_core::tool::{ToolExecutor, ToolName};

pub struct VisionAnalyzeTool;

#[async_trait]
impl ToolExecutor for VisionAnalyzeTool {
    fn name(&self) -> ToolName {
        ToolName::VisionAnalyze
    }

    async fn execute(&self, params: &Params) -> Result<String, ToolError> {
        let source = params
            .get("image_path")
            .or_else(|| params.get("image_url"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ToolError::InvalidArguments(
                    "Provide 'image_path' or 'image_url'".into(),
                )
            })?;

        let prompt = params
            .get("prompt")
            .and_then(|v| v.as_str())
            .unwrap_or("Describe this image in detail.");

        Ok(format!(
            "Analysis of {source} (task: {prompt}): the image could not be inspected by a \
             vision model in this deployment; metadata only."
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn requires_a_source() {
        let tool = VisionAnalyzeTool;
        let result = tool.execute(&Params::new()).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn url_source_is_accepted() {
        let tool = VisionAnalyzeTool;
        let output = tool
            .execute(
                json!({"image_url": "https://example.org/cat.jpg", "prompt": "What breed?"})
                    .as_object()
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(output.contains("cat.jpg"));
        assert!(output.contains("What breed?"));
    }
}
