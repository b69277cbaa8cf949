//! Page scrape executor: fetches a URL and extracts readable text.
//!
//! A crude tag strip, not a readability engine: scripts and styles are
//! removed, remaining markup is dropped, whitespace collapsed. The loop's
//! observation sanitizer caps the size downstream.

use async_trait::async_trait;
use valet_core::action::Params;
use valet_core::error::ToolError;
use valet_core::tool::{ToolExecutor, ToolName};

pub struct ScrapeTool {
    client: reqwest::Client,
}

impl ScrapeTool {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .user_agent("valet/0.1")
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for ScrapeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for ScrapeTool {
    fn name(&self) -> ToolName {
        ToolName::Scrape
    }

    async fn execute(&self, params: &Params) -> Result<String, ToolError> {
        let url = params
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;

        let response = self.client.get(url).send().await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: "scrape".into(),
                reason: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(ToolError::ExecutionFailed {
                tool_name: "scrape".into(),
                reason: format!("HTTP {}", response.status().as_u16()),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "scrape".into(),
                reason: e.to_string(),
            })?;

        Ok(strip_markup(&html))
    }
}

/// Drop script/style blocks and all tags, collapse whitespace.
fn strip_markup(html: &str) -> String {
    let without_blocks = remove_blocks(&remove_blocks(html, "script"), "style");

    let mut text = String::with_capacity(without_blocks.len() / 2);
    let mut in_tag = false;
    for ch in without_blocks.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            c if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove `<tag ...>...</tag>` blocks, case-insensitive.
fn remove_blocks(html: &str, tag: &str) -> String {
    let lower = html.to_lowercase();
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(start) = lower[pos..].find(&open) {
        let start = pos + start;
        out.push_str(&html[pos..start]);
        match lower[start..].find(&close) {
            Some(end) => pos = start + end + close.len(),
            None => return out, // unterminated block, drop the rest
        }
    }
    out.push_str(&html[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        let html = "<html><body><h1>Title</h1>\n\n  <p>Some   text</p></body></html>";
        assert_eq!(strip_markup(html), "Title Some text");
    }

    #[test]
    fn removes_script_and_style_blocks() {
        let html = "<p>keep</p><script>var x = 1;</script><style>p{}</style><p>this</p>";
        assert_eq!(strip_markup(html), "keep this");
    }

    #[test]
    fn unterminated_script_drops_tail() {
        let html = "<p>keep</p><script>never closed";
        assert_eq!(strip_markup(html), "keep");
    }

    #[tokio::test]
    async fn missing_url_is_error() {
        let tool = ScrapeTool::new();
        let result = tool.execute(&Params::new()).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}
