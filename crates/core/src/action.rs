//! Proposed tool invocations and their canonical signatures.
//!
//! An `Action` is what the model proposes in its free-text output: a tool
//! name plus root-level parameters. Its canonical serialization (stable key
//! ordering at every nesting level) is the loop signature used for equality
//! and cycle comparisons by the loop detector.

use serde_json::{Map, Value};

/// Root-level action parameters, keyed by name.
pub type Params = Map<String, Value>;

/// A structured tool invocation proposed by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// The raw tool name as declared (or inferred). May be unknown; the
    /// validator decides, not the parser.
    pub tool: String,

    /// All remaining root-level keys of the proposed object.
    pub params: Params,

    /// When set, the caller may hide this step's output from the end user.
    pub private: bool,
}

impl Action {
    pub fn new(tool: impl Into<String>, params: Params) -> Self {
        Self {
            tool: tool.into(),
            params,
            private: false,
        }
    }

    /// Look up a string parameter. Returns `None` for absent or non-string
    /// values.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// Whether a required parameter is present and non-falsy (not null,
    /// not an empty string, not `false`).
    pub fn has_param(&self, key: &str) -> bool {
        match self.params.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Bool(b)) => *b,
            Some(_) => true,
        }
    }

    /// The canonical loop signature: tool + params + private flag serialized
    /// with keys sorted at every nesting level. Two actions that differ only
    /// in key order produce identical signatures.
    pub fn signature(&self) -> String {
        let mut root = Map::new();
        root.insert("tool".into(), Value::String(self.tool.clone()));
        if self.private {
            root.insert("private".into(), Value::Bool(true));
        }
        for (k, v) in &self.params {
            root.insert(k.clone(), v.clone());
        }

        let mut out = String::new();
        write_canonical(&Value::Object(root), &mut out);
        out
    }

    /// A short human-readable input summary for progress events: the first
    /// present of the query/url/action/command parameters.
    pub fn display_input(&self) -> String {
        for key in ["query", "url", "action", "command"] {
            if let Some(v) = self.str_param(key) {
                return v.to_string();
            }
        }
        "Processing...".to_string()
    }
}

/// Serialize a JSON value with object keys sorted, independent of how the
/// underlying map preserves insertion order.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params_from(value: Value) -> Params {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn signature_is_key_order_independent() {
        let a = Action::new("search", params_from(json!({"query": "rust", "limit": 3})));
        let b = Action::new("search", params_from(json!({"limit": 3, "query": "rust"})));
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn signature_differs_on_values() {
        let a = Action::new("search", params_from(json!({"query": "rust"})));
        let b = Action::new("search", params_from(json!({"query": "go"})));
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn signature_sorts_nested_objects() {
        let a = Action::new("sandbox", params_from(json!({"opts": {"b": 1, "a": 2}})));
        let b = Action::new("sandbox", params_from(json!({"opts": {"a": 2, "b": 1}})));
        assert_eq!(a.signature(), b.signature());
    }

    #[test]
    fn display_input_prefers_query() {
        let action = Action::new(
            "search",
            params_from(json!({"query": "bitcoin price", "url": "ignored"})),
        );
        assert_eq!(action.display_input(), "bitcoin price");
    }

    #[test]
    fn display_input_falls_back_to_action() {
        let action = Action::new("manage_notes", params_from(json!({"action": "create"})));
        assert_eq!(action.display_input(), "create");
    }

    #[test]
    fn display_input_default() {
        let action = Action::new("get_time", Params::new());
        assert_eq!(action.display_input(), "Processing...");
    }

    #[test]
    fn falsy_params_are_absent() {
        let action = Action::new(
            "search",
            params_from(json!({"query": "", "flag": false, "n": 0, "missing": null})),
        );
        assert!(!action.has_param("query"));
        assert!(!action.has_param("flag"));
        assert!(!action.has_param("missing"));
        assert!(!action.has_param("nope"));
        // Numeric zero is still a value
        assert!(action.has_param("n"));
    }
}
