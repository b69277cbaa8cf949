//! Action extraction from free-text model output.
//!
//! The model is instructed to emit a bare JSON object for tool calls, but
//! embeds it anywhere in free text and sometimes gets it wrong. Extraction
//! is an explicit, isolated step with a documented fallback order so its
//! heuristics can be tested and swapped independently of the loop:
//!
//! 1. the first balanced brace-delimited object anywhere in the text
//! 2. an explicit `tool` key names the tool
//! 3. otherwise a recognized `action` key infers it (note actions map to
//!    `manage_notes`, wallet actions to `manage_wallet`)
//! 4. no usable object: the announcement heuristic may flag
//!    announce-without-acting output
//! 5. otherwise the text is the final answer
//!
//! "No action present" and "action present but malformed" are distinct
//! results; both resolve to the final-answer path, but the loop logs them
//! differently.

use serde_json::{Map, Value};
use tracing::debug;
use valet_config::AnnouncementPolicy;
use valet_core::action::Action;

const NOTE_ACTIONS: [&str; 5] = ["create", "update", "delete", "search", "categories"];
const WALLET_ACTIONS: [&str; 3] = ["balance", "history", "prepare_transfer"];

/// The result of scanning model output for an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A well-formed action with a known or unknown tool name.
    Action(Action),
    /// Brace-delimited text was found but did not parse as a JSON object.
    Malformed { snippet: String },
    /// No embedded object at all.
    None,
}

/// Extract the first embedded action from model output.
pub fn extract_action(text: &str) -> Extraction {
    let Some(snippet) = first_json_object(text) else {
        return Extraction::None;
    };

    match serde_json::from_str::<Value>(snippet) {
        Ok(Value::Object(obj)) => match build_action(obj) {
            Some(action) => Extraction::Action(action),
            // An object without a tool and without a recognizable action
            // key is not an action; the surrounding text is the answer.
            None => Extraction::None,
        },
        _ => {
            debug!(len = snippet.len(), "Embedded object is not valid JSON");
            Extraction::Malformed {
                snippet: snippet.to_string(),
            }
        }
    }
}

/// Find the first balanced `{...}` region, honoring JSON string syntax.
/// Returns an unbalanced trailing region too, so the caller can classify
/// it as malformed.
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    // Ran out of text with the object still open
    Some(&text[start..])
}

/// Turn a parsed object into an action: explicit `tool` key first, else
/// inferred from a recognized `action` value.
fn build_action(mut obj: Map<String, Value>) -> Option<Action> {
    let explicit = match obj.remove("tool") {
        Some(Value::String(name)) => Some(name),
        Some(other) => {
            // Put a non-string tool back so nothing is silently lost
            obj.insert("tool".into(), other);
            None
        }
        None => None,
    };

    let private = match obj.remove("private") {
        Some(Value::Bool(b)) => b,
        Some(other) => {
            obj.insert("private".into(), other);
            false
        }
        None => false,
    };

    let tool = match explicit {
        Some(name) => name,
        None => infer_tool(&obj)?.to_string(),
    };

    Some(Action {
        tool,
        params: obj,
        private,
    })
}

/// Infer the tool from a recognized multi-purpose `action` value.
fn infer_tool(obj: &Map<String, Value>) -> Option<&'static str> {
    let action = obj.get("action")?.as_str()?;
    if NOTE_ACTIONS.contains(&action) {
        Some("manage_notes")
    } else if WALLET_ACTIONS.contains(&action) {
        Some("manage_wallet")
    } else {
        None
    }
}

/// Does this output announce an action without emitting one?
///
/// Fuzzy by nature: short text containing both an intent phrase and a
/// tool-hint keyword. The keyword lists are a tunable policy, not a
/// correctness contract.
pub fn is_announcement(text: &str, policy: &AnnouncementPolicy) -> bool {
    if text.chars().count() >= policy.max_chars {
        return false;
    }
    let lower = text.to_lowercase();
    policy
        .intent_phrases
        .iter()
        .any(|p| lower.contains(p.as_str()))
        && policy.tool_hints.iter().any(|h| lower.contains(h.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_embedded_in_prose() {
        let text = r#"I should check the weather. {"tool": "get_weather", "city": "Paris"} That will do."#;
        match extract_action(text) {
            Extraction::Action(action) => {
                assert_eq!(action.tool, "get_weather");
                assert_eq!(action.str_param("city"), Some("Paris"));
                assert!(!action.private);
            }
            other => panic!("Expected action, got {other:?}"),
        }
    }

    #[test]
    fn handles_nested_objects() {
        let text = r#"{"tool": "sandbox", "code": "x", "opts": {"deep": {"a": 1}}}"#;
        match extract_action(text) {
            Extraction::Action(action) => {
                assert_eq!(action.tool, "sandbox");
                assert!(action.params.contains_key("opts"));
            }
            other => panic!("Expected action, got {other:?}"),
        }
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scanner() {
        let text = r#"{"tool": "search", "query": "what does {x} mean"}"#;
        match extract_action(text) {
            Extraction::Action(action) => {
                assert_eq!(action.str_param("query"), Some("what does {x} mean"));
            }
            other => panic!("Expected action, got {other:?}"),
        }
    }

    #[test]
    fn private_flag_is_lifted() {
        let text = r#"{"tool": "command", "command": "ls", "private": true}"#;
        match extract_action(text) {
            Extraction::Action(action) => {
                assert!(action.private);
                assert!(!action.params.contains_key("private"));
            }
            other => panic!("Expected action, got {other:?}"),
        }
    }

    #[test]
    fn infers_notes_tool_from_action_key() {
        let text = r#"{"action": "create", "title": "Groceries", "content": "milk"}"#;
        match extract_action(text) {
            Extraction::Action(action) => assert_eq!(action.tool, "manage_notes"),
            other => panic!("Expected action, got {other:?}"),
        }
    }

    #[test]
    fn infers_wallet_tool_from_action_key() {
        let text = r#"{"action": "balance", "address": "0xabc"}"#;
        match extract_action(text) {
            Extraction::Action(action) => assert_eq!(action.tool, "manage_wallet"),
            other => panic!("Expected action, got {other:?}"),
        }
    }

    #[test]
    fn object_without_tool_or_known_action_is_not_an_action() {
        let text = r#"Here is some data: {"temperature": 21, "city": "Paris"}"#;
        assert_eq!(extract_action(text), Extraction::None);
    }

    #[test]
    fn plain_text_is_none() {
        assert_eq!(extract_action("The answer is 42."), Extraction::None);
    }

    #[test]
    fn unbalanced_object_is_malformed() {
        let text = r#"{"tool": "search", "query": "unterminated"#;
        assert!(matches!(
            extract_action(text),
            Extraction::Malformed { .. }
        ));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let text = "{'tool': 'search', 'query': 'single quotes'}";
        assert!(matches!(
            extract_action(text),
            Extraction::Malformed { .. }
        ));
    }

    #[test]
    fn announcement_detection() {
        let policy = AnnouncementPolicy::default();
        assert!(is_announcement(
            "Let me search for the latest figures.",
            &policy
        ));
        assert!(!is_announcement("The capital of France is Paris.", &policy));
        // Intent without a tool hint is not an announcement
        assert!(!is_announcement("I will think about it.", &policy));
        // Long outputs are never announcements
        let long = format!("Let me search. {}", "words ".repeat(100));
        assert!(!is_announcement(&long, &policy));
    }
}
