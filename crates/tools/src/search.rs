//! Web search executor: deterministic stand-in for a search API.
//!
//! In production this would call a real search backend (Brave, SearxNG,
//! etc.). The stand-in returns plausible results so the orchestration loop
//! and its tests run end-to-end without network access.

use async_trait::async_trait;
use serde::Serialize;
use valet_core::action::Params;
use valet_core::error::ToolError;
use valet_core::tool::{ToolExecutor, ToolName};

pub struct SearchTool;

#[derive(Debug, Clone, Serialize)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

#[async_trait]
impl ToolExecutor for SearchTool {
    fn name(&self) -> ToolName {
        ToolName::Search
    }

    async fn execute(&self, params: &Params) -> Result<String, ToolError> {
        let query = params
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let results = generate_results(query, 3);
        serde_json::to_string_pretty(&results).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "search".into(),
            reason: e.to_string(),
        })
    }
}

fn generate_results(query: &str, count: usize) -> Vec<SearchResult> {
    let q = query.to_lowercase();

    // Context-aware canned results for common topics
    if q.contains("weather") {
        return vec![
            SearchResult {
                title: "Weather Forecast".into(),
                url: "https://weather.example.org/forecast".into(),
                snippet: "Current conditions and hourly forecasts for any location.".into(),
            },
            SearchResult {
                title: "OpenWeatherMap".into(),
                url: "https://openweathermap.org/".into(),
                snippet: "Weather API providing current data and forecasts.".into(),
            },
        ];
    }

    if q.contains("bitcoin") || q.contains("crypto") {
        return vec![
            SearchResult {
                title: "Bitcoin Price Index".into(),
                url: "https://markets.example.org/btc".into(),
                snippet: "Live BTC price, market cap, and 24h volume.".into(),
            },
            SearchResult {
                title: "Crypto Market Overview".into(),
                url: "https://markets.example.org/overview".into(),
                snippet: "Top cryptocurrencies by market capitalization.".into(),
            },
        ];
    }

    (0..count)
        .map(|i| SearchResult {
            title: format!("Result {} for: {}", i + 1, query),
            url: format!(
                "https://search.example.org/?q={}&p={}",
                query.replace(' ', "+"),
                i + 1
            ),
            snippet: format!("Relevant content for the query '{query}'."),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Params {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn search_returns_results() {
        let tool = SearchTool;
        let output = tool
            .execute(&params(json!({"query": "bitcoin price"})))
            .await
            .unwrap();
        assert!(output.contains("Bitcoin"));
    }

    #[tokio::test]
    async fn missing_query_is_error() {
        let tool = SearchTool;
        let result = tool.execute(&Params::new()).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn generic_query_gets_fallback_results() {
        let tool = SearchTool;
        let output = tool
            .execute(&params(json!({"query": "rust borrow checker"})))
            .await
            .unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.len(), 3);
    }
}
