//! The caller-facing event stream.
//!
//! Each turn emits an append-only, ordered sequence of these records. The
//! wire encoding is newline-delimited JSON with a `type` tag:
//!
//! - `info`      : liveness notes before the first model call
//! - `thought`   : raw model output for a step
//! - `step_start`: a tool is about to execute
//! - `step_end`  : tool execution completed
//! - `final`     : the answer; always the last record of a successful turn
//! - `error`     : terminal failure; always the last record of a failed turn
//!
//! Exactly one terminal record (`final` or `error`) ends every turn.

use serde::{Deserialize, Serialize};
use valet_core::tool::ToolStatus;

/// Events emitted by the orchestration loop during a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepEvent {
    /// Progress note before or between model calls.
    Info { content: String },

    /// Raw model output for one step.
    Thought { content: String },

    /// A validated action is about to execute.
    StepStart { tool: String, input: String },

    /// Tool execution completed.
    StepEnd {
        tool: String,
        input: String,
        output: String,
        status: ToolStatus,
    },

    /// The final answer. Terminal.
    Final { content: String },

    /// A turn-fatal failure. Terminal.
    Error { content: String },
}

impl StepEvent {
    /// Wire name of this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Info { .. } => "info",
            Self::Thought { .. } => "thought",
            Self::StepStart { .. } => "step_start",
            Self::StepEnd { .. } => "step_end",
            Self::Final { .. } => "final",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this record ends the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final { .. } | Self::Error { .. })
    }

    /// Encode as one NDJSON line, trailing newline included.
    pub fn to_ndjson(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","content":"event serialization failed"}"#.to_string()
        });
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_thought() {
        let event = StepEvent::Thought {
            content: "pondering".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"thought""#));
        assert!(json.contains(r#""content":"pondering""#));
    }

    #[test]
    fn serialization_step_end() {
        let event = StepEvent::StepEnd {
            tool: "search".into(),
            input: "bitcoin price".into(),
            output: "results".into(),
            status: ToolStatus::Success,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"step_end""#));
        assert!(json.contains(r#""status":"success""#));
    }

    #[test]
    fn terminal_classification() {
        assert!(StepEvent::Final { content: "x".into() }.is_terminal());
        assert!(StepEvent::Error { content: "x".into() }.is_terminal());
        assert!(!StepEvent::Thought { content: "x".into() }.is_terminal());
        assert!(
            !StepEvent::StepStart {
                tool: "t".into(),
                input: "i".into()
            }
            .is_terminal()
        );
    }

    #[test]
    fn event_type_names() {
        assert_eq!(StepEvent::Info { content: "".into() }.event_type(), "info");
        assert_eq!(
            StepEvent::Final { content: "".into() }.event_type(),
            "final"
        );
    }

    #[test]
    fn ndjson_line_ends_with_newline() {
        let line = StepEvent::Info {
            content: "starting".into(),
        }
        .to_ndjson();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn deserialization_roundtrip() {
        let json = r#"{"type":"step_start","tool":"search","input":"q"}"#;
        let event: StepEvent = serde_json::from_str(json).unwrap();
        match event {
            StepEvent::StepStart { tool, input } => {
                assert_eq!(tool, "search");
                assert_eq!(input, "q");
            }
            _ => panic!("Wrong variant"),
        }
    }
}
