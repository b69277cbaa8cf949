//! Context window assembly.
//!
//! Builds the token-bounded ordered message sequence sent to the model on
//! each step:
//!
//! 1. **System prompt**: always included, never dropped
//! 2. **System state**: best-effort; included only while the running total
//!    stays under 20% of the budget
//! 3. **Summary of dropped history**: synthesized when older turns fall
//!    off the window and budget is left over
//! 4. **Recent history**: newest-first accumulation, reinserted in
//!    chronological order
//! 5. **User query**: always included, never dropped
//!
//! The total never knowingly exceeds the budget except by the fixed
//! 200-token reservation; if the reservation arithmetic goes negative the
//! history budget is floored at a 500-token safety minimum instead.

use crate::context::token;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;
use valet_core::message::{Message, Role};

/// Fixed reservation subtracted from the budget before history is admitted.
const RESERVED_TOKENS: usize = 200;

/// History budget floor used when the reservation arithmetic goes negative.
const SAFETY_FLOOR_TOKENS: usize = 500;

/// Minimum leftover budget required to bother synthesizing a summary of
/// dropped history.
const SUMMARY_MIN_LEFTOVER: usize = 300;

/// System state may consume at most this fraction of the budget.
const STATE_BUDGET_FRACTION: f64 = 0.2;

/// Topic keywords scanned when summarizing dropped history.
const TOPIC_KEYWORDS: [&str; 9] = [
    "bitcoin", "crypto", "note", "wallet", "search", "python", "fix", "weather", "calendar",
];

/// All inputs for one assembly.
pub struct ContextInput<'a> {
    /// The system prompt (always included).
    pub system_prompt: &'a str,
    /// The current user query (always included).
    pub user_query: &'a str,
    /// Normalized prior history, oldest first.
    pub history: &'a [Message],
    /// Optional system-state snapshot, rendered as a system message.
    pub system_state: Option<&'a BTreeMap<String, String>>,
}

/// The context builder. Stateless; create one per turn and reuse it.
pub struct ContextBuilder {
    budget: usize,
}

impl ContextBuilder {
    /// Create a builder with the given token budget.
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    /// Assemble the window: [system, state?, summary?, history..., query].
    pub fn build(&self, input: &ContextInput<'_>) -> Vec<Message> {
        let mut window = Vec::new();
        let mut used = 0usize;

        // 1. System prompt, unconditionally
        used += token::estimate_tokens(input.system_prompt);
        window.push(Message::system(input.system_prompt));

        // 2. System state, only while it stays under 20% of the budget
        if let Some(state) = input.system_state {
            let content = render_state(state);
            let cost = token::estimate_tokens(&content);
            let cap = (self.budget as f64 * STATE_BUDGET_FRACTION) as usize;
            if used + cost < cap {
                used += cost;
                window.push(Message::system(content));
            } else {
                debug!(cost, cap, "System state dropped, over state budget");
            }
        }

        // 3. User query is reserved now, appended last
        let query_tokens = token::estimate_tokens(input.user_query);

        // 4. Remaining history budget, floored at the safety minimum
        let spoken_for = used + query_tokens + RESERVED_TOKENS;
        let remaining = if spoken_for > self.budget {
            SAFETY_FLOOR_TOKENS
        } else {
            self.budget - spoken_for
        };

        // 5. Walk history newest to oldest, stop before exceeding the budget
        let mut included: Vec<Message> = Vec::new();
        let mut history_tokens = 0usize;
        for msg in input.history.iter().rev() {
            let cost = token::estimate_tokens(&msg.content);
            if history_tokens + cost > remaining {
                break;
            }
            history_tokens += cost;
            included.push(msg.clone());
        }
        included.reverse();

        // 6. Summarize what fell off, if there's budget left for it
        let dropped = input.history.len() - included.len();
        if dropped > 0 && remaining - history_tokens > SUMMARY_MIN_LEFTOVER {
            let summary = summarize_dropped(&input.history[..dropped]);
            window.push(Message::system(format!(
                "PREVIOUS_CONVERSATION_SUMMARY: {summary}"
            )));
        }

        if dropped > 0 {
            debug!(
                dropped,
                included = included.len(),
                "Older history trimmed from context window"
            );
        }

        // 7. Final assembly
        window.extend(included);
        window.push(Message::user(input.user_query));
        window
    }
}

fn render_state(state: &BTreeMap<String, String>) -> String {
    let mut out = String::from("SYSTEM_STATE:");
    for (key, value) in state {
        out.push('\n');
        out.push_str(key);
        out.push_str(": ");
        out.push_str(value);
    }
    out
}

/// Heuristic topic-keyword summary of dropped history items.
fn summarize_dropped(dropped: &[Message]) -> String {
    let mut topics: Vec<&str> = Vec::new();
    for keyword in TOPIC_KEYWORDS {
        if dropped
            .iter()
            .any(|m| m.content.to_lowercase().contains(keyword))
        {
            topics.push(keyword);
        }
    }
    topics.truncate(5);

    if topics.is_empty() {
        "Earlier context involved general assistant interactions.".to_string()
    } else {
        format!("Discussed topics like {}.", topics.join(", "))
    }
}

/// Normalize caller-supplied raw history items into messages.
///
/// Two shapes are accepted: already-formatted `{role, content}` pairs, and
/// the legacy frontend shape `{type: input|output|agent-step, text}`.
/// Anything else is dropped silently; a malformed history item must never
/// fail the turn.
pub fn normalize_history(items: &[Value]) -> Vec<Message> {
    items.iter().filter_map(normalize_item).collect()
}

fn normalize_item(item: &Value) -> Option<Message> {
    let obj = item.as_object()?;

    // Direct support for already-formatted messages
    if let (Some(role), Some(content)) = (
        obj.get("role").and_then(Value::as_str),
        obj.get("content").and_then(Value::as_str),
    ) {
        let role: Role = role.parse().ok()?;
        return Some(Message {
            role,
            content: content.to_string(),
        });
    }

    let kind = obj.get("type")?.as_str()?;
    let text = obj.get("text")?;

    match kind {
        "input" => Some(Message::user(
            text.as_str().unwrap_or_default().replace("> ", ""),
        )),
        "output" => Some(Message::assistant(text.as_str().unwrap_or_default())),
        "agent-step" => {
            let step = text.as_object()?;
            let tool = step.get("tool").and_then(Value::as_str).unwrap_or("cmd");
            let input = step.get("input").and_then(Value::as_str).unwrap_or("");
            let output = step
                .get("output")
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            let clipped: String = output.chars().take(150).collect();
            Some(Message::assistant(format!(
                "[TOOL] {tool}({input}) -> {clipped}"
            )))
        }
        _ => None,
    }
}

/// Merge consecutive same-role messages and drop empty ones.
///
/// Some endpoints reject windows with adjacent messages of the same role;
/// the loop also produces assistant/user pairs that can collide with
/// normalized history.
pub fn coalesce(messages: Vec<Message>) -> Vec<Message> {
    let mut cleaned: Vec<Message> = Vec::with_capacity(messages.len());
    for msg in messages {
        if msg.content.is_empty() {
            continue;
        }
        match cleaned.last_mut() {
            Some(last) if last.role == msg.role => {
                last.content.push_str("\n\n");
                last.content.push_str(&msg.content);
            }
            _ => cleaned.push(msg),
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn messages(n: usize, len: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                let filler = "x".repeat(len.saturating_sub(8));
                Message::user(format!("msg {i:03} {filler}"))
            })
            .collect()
    }

    #[test]
    fn window_order_is_system_history_query() {
        let builder = ContextBuilder::new(30_000);
        let history = vec![Message::user("earlier"), Message::assistant("reply")];
        let window = builder.build(&ContextInput {
            system_prompt: "You are Valet.",
            user_query: "what now?",
            history: &history,
            system_state: None,
        });

        assert_eq!(window.len(), 4);
        assert_eq!(window[0].role, Role::System);
        assert_eq!(window[1].content, "earlier");
        assert_eq!(window[2].content, "reply");
        assert_eq!(window.last().unwrap().content, "what now?");
        assert_eq!(window.last().unwrap().role, Role::User);
    }

    #[test]
    fn system_state_included_under_budget_fraction() {
        let builder = ContextBuilder::new(30_000);
        let mut state = BTreeMap::new();
        state.insert("connected_wallet".to_string(), "0xabc".to_string());
        let window = builder.build(&ContextInput {
            system_prompt: "prompt",
            user_query: "q",
            history: &[],
            system_state: Some(&state),
        });

        assert!(window[1].content.starts_with("SYSTEM_STATE:"));
        assert!(window[1].content.contains("connected_wallet: 0xabc"));
    }

    #[test]
    fn oversized_system_state_is_dropped() {
        let builder = ContextBuilder::new(1000);
        let mut state = BTreeMap::new();
        // ~2000 tokens, way over 20% of 1000
        state.insert("blob".to_string(), "y".repeat(8000));
        let window = builder.build(&ContextInput {
            system_prompt: "prompt",
            user_query: "q",
            history: &[],
            system_state: Some(&state),
        });

        assert!(!window.iter().any(|m| m.content.contains("SYSTEM_STATE")));
        assert_eq!(window.last().unwrap().content, "q");
    }

    #[test]
    fn negative_budget_floors_at_safety_minimum() {
        // System prompt ~900 tokens against a 1000-token budget: the
        // reservation arithmetic goes negative, history budget becomes 500,
        // and the query is still included verbatim.
        let builder = ContextBuilder::new(1000);
        let prompt = "p".repeat(3600); // 900 tokens
        let history = messages(10, 400); // 100 tokens each
        let window = builder.build(&ContextInput {
            system_prompt: &prompt,
            user_query: "still here",
            history: &history,
            system_state: None,
        });

        assert_eq!(window.last().unwrap().content, "still here");
        // 500-token floor admits 5 of the 100-token messages
        let included: Vec<_> = window
            .iter()
            .filter(|m| m.content.starts_with("msg "))
            .collect();
        assert_eq!(included.len(), 5);
    }

    #[test]
    fn history_is_trimmed_newest_first() {
        let builder = ContextBuilder::new(1000);
        // prompt 10 tokens, query small: remaining ~= 1000 - 10 - 1 - 200
        let history = messages(20, 400); // 100 tokens each, only ~7 fit
        let window = builder.build(&ContextInput {
            system_prompt: "You are Valet and you help.",
            user_query: "q",
            history: &history,
            system_state: None,
        });

        let included: Vec<&str> = window
            .iter()
            .filter(|m| m.content.starts_with("msg "))
            .map(|m| &m.content[..7])
            .collect();
        // The newest messages survive, in chronological order
        assert!(included.len() < 20);
        assert_eq!(*included.last().unwrap(), "msg 019");
        let first: usize = 20 - included.len();
        assert_eq!(*included.first().unwrap(), format!("msg {first:03}"));
    }

    #[test]
    fn dropped_history_gets_summary_when_budget_allows() {
        let builder = ContextBuilder::new(2000);
        let mut history = messages(3, 4000); // 1000 tokens each, none fit twice over
        history[0].content = format!("tell me about bitcoin {}", "x".repeat(4000));
        history[1].content = format!("and my wallet {}", "x".repeat(4000));
        let window = builder.build(&ContextInput {
            system_prompt: "short",
            user_query: "q",
            history: &history,
            system_state: None,
        });

        let summary = window
            .iter()
            .find(|m| m.content.starts_with("PREVIOUS_CONVERSATION_SUMMARY:"))
            .expect("summary message");
        assert!(summary.content.contains("bitcoin"));
        assert!(summary.content.contains("wallet"));
        // Summary sits directly after the system prompt block
        assert_eq!(window[1].content, summary.content);
    }

    #[test]
    fn no_summary_without_drops() {
        let builder = ContextBuilder::new(30_000);
        let history = messages(3, 50);
        let window = builder.build(&ContextInput {
            system_prompt: "short",
            user_query: "q",
            history: &history,
            system_state: None,
        });
        assert!(
            !window
                .iter()
                .any(|m| m.content.starts_with("PREVIOUS_CONVERSATION_SUMMARY:"))
        );
    }

    #[test]
    fn normalize_passes_role_content_through() {
        let items = vec![json!({"role": "assistant", "content": "hi"})];
        let normalized = normalize_history(&items);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].role, Role::Assistant);
        assert_eq!(normalized[0].content, "hi");
    }

    #[test]
    fn normalize_maps_legacy_shapes() {
        let items = vec![
            json!({"type": "input", "text": "> hello"}),
            json!({"type": "output", "text": "world"}),
            json!({"type": "agent-step", "text": {"tool": "search", "input": "q", "output": "found things"}}),
        ];
        let normalized = normalize_history(&items);
        assert_eq!(normalized.len(), 3);
        assert_eq!(normalized[0].content, "hello");
        assert_eq!(normalized[0].role, Role::User);
        assert_eq!(normalized[1].role, Role::Assistant);
        assert_eq!(normalized[2].content, "[TOOL] search(q) -> found things");
    }

    #[test]
    fn normalize_drops_unmappable_items() {
        let items = vec![
            json!({"type": "telemetry", "text": "ignored"}),
            json!("not an object"),
            json!({"role": "wizard", "content": "bad role"}),
            json!({"type": "output", "text": "kept"}),
        ];
        let normalized = normalize_history(&items);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].content, "kept");
    }

    #[test]
    fn coalesce_merges_consecutive_roles() {
        let merged = coalesce(vec![
            Message::system("a"),
            Message::system("b"),
            Message::user(""),
            Message::user("c"),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].content, "a\n\nb");
        assert_eq!(merged[1].content, "c");
    }
}
