//! Pre-execution action validation.
//!
//! A schema-driven gate that rejects malformed, unknown, dangerous, or
//! redundant proposed actions before anything executes, returning a
//! corrective reason and suggestion the loop feeds back to the model.
//! Pure function of (action, recent context); no state across calls.

use url::Url;
use valet_core::action::Action;
use valet_core::message::Message;
use valet_core::tool::ToolName;

const MIN_SEARCH_QUERY_LEN: usize = 3;
const MAX_SEARCH_QUERY_LEN: usize = 200;
const MIN_IMAGE_QUERY_LEN: usize = 2;
const MAX_SANDBOX_CODE_LEN: usize = 5000;

/// Command substrings that are never allowed through.
const DANGEROUS_COMMANDS: [&str; 5] = ["rm -rf", "sudo ", "dd ", "> /", ":(){ :|:& };:"];

const NOTE_ACTIONS: [&str; 5] = ["create", "search", "update", "delete", "categories"];
const CALENDAR_ACTIONS: [&str; 4] = ["add", "list", "remove", "update"];
const WALLET_ACTIONS: [&str; 3] = ["balance", "history", "prepare_transfer"];
const OSINT_TYPES: [&str; 3] = ["username", "domain", "email"];

/// A validation rejection: why, and what to do instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub reason: String,
    pub suggestion: String,
}

impl Rejection {
    fn new(reason: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// The action validator.
pub struct ActionValidator {
    redundancy_lookback: usize,
}

impl ActionValidator {
    pub fn new(redundancy_lookback: usize) -> Self {
        Self {
            redundancy_lookback,
        }
    }

    /// Validate a proposed action against its tool schema and the recent
    /// context window.
    pub fn validate(&self, action: &Action, recent: &[Message]) -> Result<(), Rejection> {
        if action.tool.is_empty() {
            return Err(Rejection::new(
                "Missing tool name",
                r#"Specify which tool to use in the format {"tool": "...", ...}"#,
            ));
        }

        let Some(tool) = ToolName::parse(&action.tool) else {
            let known: Vec<&str> = ToolName::ALL.iter().map(ToolName::as_str).collect();
            return Err(Rejection::new(
                format!("Unknown tool: {}", action.tool),
                format!("Available tools: {}", known.join(", ")),
            ));
        };

        for param in required_params(tool) {
            if !action.has_param(param) {
                return Err(Rejection::new(
                    format!("Missing required parameter: {param}"),
                    format!("Add '{param}' to the {tool} call"),
                ));
            }
        }

        self.check_tool_constraints(tool, action)?;

        if self.is_redundant(tool, action, recent) {
            return Err(Rejection::new(
                "Information already available or recently sought in context",
                "Summarize what you already found or try a different search term",
            ));
        }

        Ok(())
    }

    fn check_tool_constraints(&self, tool: ToolName, action: &Action) -> Result<(), Rejection> {
        match tool {
            ToolName::Search => {
                let query = action.str_param("query").unwrap_or_default();
                let len = query.chars().count();
                if len < MIN_SEARCH_QUERY_LEN {
                    return Err(Rejection::new(
                        format!("Query too short ({len} chars, need {MIN_SEARCH_QUERY_LEN}+)"),
                        "Use more specific search terms",
                    ));
                }
                if len > MAX_SEARCH_QUERY_LEN {
                    return Err(Rejection::new(
                        format!("Query too long ({len} chars, max {MAX_SEARCH_QUERY_LEN})"),
                        "Shorten the query to its essence",
                    ));
                }
            }
            ToolName::Scrape => {
                let url = action.str_param("url").unwrap_or_default();
                if !is_valid_http_url(url) {
                    return Err(Rejection::new(
                        format!("Invalid URL format: {url}"),
                        "Provide a valid HTTP or HTTPS URL",
                    ));
                }
            }
            ToolName::Sandbox => {
                let code = action.str_param("code").unwrap_or_default();
                if code.chars().count() > MAX_SANDBOX_CODE_LEN {
                    return Err(Rejection::new(
                        format!("Code too long (max {MAX_SANDBOX_CODE_LEN} chars)"),
                        "Split the computation into smaller snippets",
                    ));
                }
            }
            ToolName::Command => {
                let command = action.str_param("command").unwrap_or_default();
                if DANGEROUS_COMMANDS.iter().any(|d| command.contains(d)) {
                    return Err(Rejection::new(
                        format!("Potentially dangerous command detected: {command}"),
                        "Restricted command. Try a different approach.",
                    ));
                }
            }
            ToolName::ManageNotes => check_enumerated_action(action, tool, &NOTE_ACTIONS)?,
            ToolName::ManageCalendar => check_enumerated_action(action, tool, &CALENDAR_ACTIONS)?,
            ToolName::ManageWallet => check_enumerated_action(action, tool, &WALLET_ACTIONS)?,
            ToolName::ImageSearch => {
                let query = action.str_param("query").unwrap_or_default();
                if query.chars().count() < MIN_IMAGE_QUERY_LEN {
                    return Err(Rejection::new(
                        format!("Query too short (need {MIN_IMAGE_QUERY_LEN}+ chars)"),
                        "Use more specific search terms",
                    ));
                }
            }
            ToolName::VisionAnalyze => {
                if !action.has_param("image_path") && !action.has_param("image_url") {
                    return Err(Rejection::new(
                        "No image source provided",
                        "Add 'image_path' or 'image_url' to the vision_analyze call",
                    ));
                }
            }
            ToolName::OsintLookup => {
                let kind = action.str_param("type").unwrap_or_default();
                if !OSINT_TYPES.contains(&kind) {
                    return Err(Rejection::new(
                        format!("Invalid lookup type '{kind}' for osint_lookup"),
                        format!("Use one of: {}", OSINT_TYPES.join(", ")),
                    ));
                }
            }
            ToolName::GetTime | ToolName::GetWeather => {}
        }
        Ok(())
    }

    /// A search is redundant when the same query was already issued within
    /// the recent context window.
    fn is_redundant(&self, tool: ToolName, action: &Action, recent: &[Message]) -> bool {
        if tool != ToolName::Search {
            return false;
        }

        let query = action.str_param("query").unwrap_or_default().to_lowercase();
        let needle = format!("input: {query}");
        let start = recent.len().saturating_sub(self.redundancy_lookback);

        recent[start..]
            .iter()
            .any(|m| m.content.to_lowercase().contains(&needle))
    }
}

fn required_params(tool: ToolName) -> &'static [&'static str] {
    match tool {
        ToolName::Search | ToolName::ImageSearch => &["query"],
        ToolName::Scrape => &["url"],
        ToolName::Sandbox => &["code"],
        ToolName::Command => &["command"],
        ToolName::ManageNotes | ToolName::ManageWallet | ToolName::ManageCalendar => &["action"],
        ToolName::OsintLookup => &["target", "type"],
        ToolName::GetWeather => &["city"],
        ToolName::VisionAnalyze | ToolName::GetTime => &[],
    }
}

fn check_enumerated_action(
    action: &Action,
    tool: ToolName,
    valid: &[&str],
) -> Result<(), Rejection> {
    let value = action.str_param("action").unwrap_or_default();
    if valid.contains(&value) {
        Ok(())
    } else {
        Err(Rejection::new(
            format!("Invalid action '{value}' for {tool}"),
            format!("Use one of: {}", valid.join(", ")),
        ))
    }
}

fn is_valid_http_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}
