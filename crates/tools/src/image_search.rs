//! Image search executor: deterministic stand-in for an image API.

use async_trait::async_trait;
use serde::Serialize;
use valet_core::action::Params;
use valet_core::error::ToolError;
use valet_core::tool::{ToolExecutor, ToolName};

pub struct ImageSearchTool;

#[derive(Debug, Serialize)]
struct ImageResult {
    title: String,
    url: String,
    thumbnail: String,
}

#[async_trait]
impl ToolExecutor for ImageSearchTool {
    fn name(&self) -> ToolName {
        ToolName::ImageSearch
    }

    async fn execute(&self, params: &Params) -> Result<String, ToolError> {
        let query = params
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let slug = query.replace(' ', "-");
        let results: Vec<ImageResult> = (1..=3)
            .map(|i| ImageResult {
                title: format!("{query} ({i})"),
                url: format!("https://images.example.org/{slug}/{i}.jpg"),
                thumbnail: format!("https://images.example.org/{slug}/{i}_thumb.jpg"),
            })
            .collect();

        serde_json::to_string(&results).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "image_search".into(),
            reason: e.to_string(),
        })
    }
}
