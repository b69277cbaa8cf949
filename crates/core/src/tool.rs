//! Tool executor trait and the closed set of known tools.
//!
//! Tools are what give the assistant the ability to act in the world: web
//! search, page scraping, sandboxed code, shell commands, notes, calendar,
//! wallet, and so on. The set of tool names is a closed enum so dispatch is
//! exhaustiveness-checked at compile time rather than falling through to a
//! runtime "not implemented" branch.

use crate::action::Params;
use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The closed set of tools the orchestration loop knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    Search,
    Scrape,
    Sandbox,
    Command,
    ManageNotes,
    ManageWallet,
    ManageCalendar,
    ImageSearch,
    VisionAnalyze,
    OsintLookup,
    GetTime,
    GetWeather,
}

impl ToolName {
    /// Every known tool, in stable declaration order.
    pub const ALL: [ToolName; 12] = [
        ToolName::Search,
        ToolName::Scrape,
        ToolName::Sandbox,
        ToolName::Command,
        ToolName::ManageNotes,
        ToolName::ManageWallet,
        ToolName::ManageCalendar,
        ToolName::ImageSearch,
        ToolName::VisionAnalyze,
        ToolName::OsintLookup,
        ToolName::GetTime,
        ToolName::GetWeather,
    ];

    /// The wire name the model uses to request this tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Search => "search",
            ToolName::Scrape => "scrape",
            ToolName::Sandbox => "sandbox",
            ToolName::Command => "command",
            ToolName::ManageNotes => "manage_notes",
            ToolName::ManageWallet => "manage_wallet",
            ToolName::ManageCalendar => "manage_calendar",
            ToolName::ImageSearch => "image_search",
            ToolName::VisionAnalyze => "vision_analyze",
            ToolName::OsintLookup => "osint_lookup",
            ToolName::GetTime => "get_time",
            ToolName::GetWeather => "get_weather",
        }
    }

    /// Resolve a wire name to a known tool, if any.
    pub fn parse(name: &str) -> Option<ToolName> {
        ToolName::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a dispatched tool call succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// The captured result of one dispatched tool call. Executor failures are
/// folded into an error-status outcome, never propagated out of dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// The output content (or a diagnostic message on error)
    pub output: String,

    /// Whether the executor succeeded
    pub status: ToolStatus,
}

impl ToolOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            status: ToolStatus::Success,
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            status: ToolStatus::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }
}

/// The core tool executor trait.
///
/// Each named capability implements this trait. Executors are registered in
/// the dispatcher and invoked with the action's root-level parameters.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Which tool this executor serves.
    fn name(&self) -> ToolName;

    /// Run the tool. Returns the raw string result; errors are captured by
    /// the dispatcher, not surfaced to the loop.
    async fn execute(&self, params: &Params) -> std::result::Result<String, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_roundtrip() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::parse(tool.as_str()), Some(tool));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(ToolName::parse("monitor_live_feed"), None);
        assert_eq!(ToolName::parse(""), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        let outcome = ToolOutcome::success("ok");
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains(r#""status":"success""#));
    }
}
