//! OSINT lookup executor: deterministic stand-in for identity lookups.
//!
//! Supports username, domain, and email targets.

use async_trait::async_trait;
use valet_core::action::Params;
use valet_core::error::ToolError;
use valet_core::tool::{ToolExecutor, ToolName};

pub struct OsintLookupTool;

#[async_trait]
impl ToolExecutor for OsintLookupTool {
    fn name(&self) -> ToolName {
        ToolName::OsintLookup
    }

    async fn execute(&self, params: &Params) -> Result<String, ToolError> {
        let target = params
            .get("target")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'target' argument".into()))?;
        let kind = params
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'type' argument".into()))?;

        let payload = match kind {
            "username" => serde_json::json!({
                "target": target,
                "type": "username",
                "profiles": [
                    {"site": "github", "exists": true, "url": format!("https://github.com/{target}")},
                    {"site": "mastodon", "exists": false},
                ],
            }),
            "domain" => serde_json::json!({
                "target": target,
                "type": "domain",
                "registrar": "Example Registrar Inc.",
                "name_servers": ["ns1.example.net", "ns2.example.net"],
            }),
            "email" => serde_json::json!({
                "target": target,
                "type": "email",
                "breaches": [],
                "deliverable": true,
            }),
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "Unknown lookup type: {other}"
                )));
            }
        };

        Ok(payload.to_string())
    }
}
