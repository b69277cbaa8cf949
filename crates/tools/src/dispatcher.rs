//! Uniform tool invocation surface.
//!
//! The dispatcher maps a validated action's tool name to exactly one
//! registered executor and captures every failure as an error-status
//! outcome. A tool call never aborts the turn; the loop feeds the outcome
//! back to the model as an observation either way.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use valet_core::action::Action;
use valet_core::memory::MemoryStore;
use valet_core::tool::{ToolExecutor, ToolName, ToolOutcome};

/// Dispatches actions to registered executors.
pub struct ToolDispatcher {
    executors: HashMap<ToolName, Arc<dyn ToolExecutor>>,
    memory: Option<Arc<dyn MemoryStore>>,
}

impl ToolDispatcher {
    pub fn new(memory: Option<Arc<dyn MemoryStore>>) -> Self {
        Self {
            executors: HashMap::new(),
            memory,
        }
    }

    /// Register an executor. Replaces any existing executor for the same
    /// tool.
    pub fn register(&mut self, executor: Arc<dyn ToolExecutor>) {
        self.executors.insert(executor.name(), executor);
    }

    /// The tools currently registered, in stable declaration order.
    pub fn registered(&self) -> Vec<ToolName> {
        ToolName::ALL
            .iter()
            .copied()
            .filter(|t| self.executors.contains_key(t))
            .collect()
    }

    /// Execute a proposed action. Unknown or unregistered tools and executor
    /// failures all fold into an error-status outcome.
    pub async fn execute(&self, action: &Action) -> ToolOutcome {
        let Some(tool) = ToolName::parse(&action.tool) else {
            return ToolOutcome::error(format!("Unknown tool: {}", action.tool));
        };

        let Some(executor) = self.executors.get(&tool) else {
            return ToolOutcome::error(format!("Tool not registered: {tool}"));
        };

        debug!(tool = %tool, "Dispatching tool");

        match executor.execute(&action.params).await {
            Ok(output) => {
                self.offer_to_memory(tool, action, &output).await;
                ToolOutcome::success(output)
            }
            Err(e) => {
                warn!(tool = %tool, error = %e, "Tool execution failed");
                ToolOutcome::error(format!(
                    "[TOOL_ERROR] Execution failed: {e}. Analyze this error and retry or adapt your plan."
                ))
            }
        }
    }

    /// Offer selected tool results to the long-term memory collaborator.
    /// Best-effort: failures are logged, never surfaced.
    async fn offer_to_memory(&self, tool: ToolName, action: &Action, output: &str) {
        let Some(memory) = &self.memory else {
            return;
        };

        let (text, metadata) = match tool {
            ToolName::Command => {
                let cmd = action.str_param("command").unwrap_or_default();
                let clipped: String = output.chars().take(500).collect();
                (
                    format!("COMMAND: {cmd}\nRESULT: {clipped}"),
                    serde_json::json!({"type": "command", "command": cmd}),
                )
            }
            ToolName::VisionAnalyze => (
                format!("IMAGE_MEMORY: {output}"),
                serde_json::json!({
                    "type": "vision",
                    "path": action.str_param("image_path"),
                }),
            ),
            _ => return,
        };

        if output.is_empty() {
            return;
        }

        if let Err(e) = memory.add(&text, metadata).await {
            warn!(tool = %tool, error = %e, "Memory offer failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use valet_core::action::Params;
    use valet_core::error::ToolError;
    use valet_core::tool::ToolStatus;

    struct OkTool;

    #[async_trait]
    impl ToolExecutor for OkTool {
        fn name(&self) -> ToolName {
            ToolName::GetTime
        }
        async fn execute(&self, _params: &Params) -> Result<String, ToolError> {
            Ok("now".into())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolExecutor for FailingTool {
        fn name(&self) -> ToolName {
            ToolName::Search
        }
        async fn execute(&self, _params: &Params) -> Result<String, ToolError> {
            Err(ToolError::ExecutionFailed {
                tool_name: "search".into(),
                reason: "upstream down".into(),
            })
        }
    }

    fn action(tool: &str) -> Action {
        Action::new(tool, Params::new())
    }

    #[tokio::test]
    async fn dispatch_success() {
        let mut dispatcher = ToolDispatcher::new(None);
        dispatcher.register(Arc::new(OkTool));

        let outcome = dispatcher.execute(&action("get_time")).await;
        assert_eq!(outcome.status, ToolStatus::Success);
        assert_eq!(outcome.output, "now");
    }

    #[tokio::test]
    async fn failure_becomes_error_outcome() {
        let mut dispatcher = ToolDispatcher::new(None);
        dispatcher.register(Arc::new(FailingTool));

        let outcome = dispatcher.execute(&action("search")).await;
        assert_eq!(outcome.status, ToolStatus::Error);
        assert!(outcome.output.contains("[TOOL_ERROR]"));
        assert!(outcome.output.contains("upstream down"));
    }

    struct RecordingMemory {
        texts: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl valet_core::memory::MemoryStore for RecordingMemory {
        async fn search(
            &self,
            _text: &str,
            _top_k: usize,
            _min_score: f32,
        ) -> Result<Vec<valet_core::memory::MemorySnippet>, valet_core::error::MemoryError>
        {
            Ok(Vec::new())
        }

        async fn add(
            &self,
            text: &str,
            _metadata: serde_json::Value,
        ) -> Result<(), valet_core::error::MemoryError> {
            self.texts.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct EchoCommandTool;

    #[async_trait]
    impl ToolExecutor for EchoCommandTool {
        fn name(&self) -> ToolName {
            ToolName::Command
        }
        async fn execute(&self, params: &Params) -> Result<String, ToolError> {
            Ok(params
                .get("command")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string())
        }
    }

    #[tokio::test]
    async fn command_output_is_offered_to_memory() {
        let memory = Arc::new(RecordingMemory {
            texts: std::sync::Mutex::new(Vec::new()),
        });
        let mut dispatcher = ToolDispatcher::new(Some(memory.clone()));
        dispatcher.register(Arc::new(EchoCommandTool));

        let mut action = Action::new("command", Params::new());
        action
            .params
            .insert("command".into(), serde_json::json!("uname -a"));

        let outcome = dispatcher.execute(&action).await;
        assert_eq!(outcome.status, ToolStatus::Success);

        let texts = memory.texts.lock().unwrap();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("COMMAND: uname -a"));
        assert!(texts[0].contains("RESULT:"));
    }

    #[tokio::test]
    async fn other_tools_do_not_touch_memory() {
        let memory = Arc::new(RecordingMemory {
            texts: std::sync::Mutex::new(Vec::new()),
        });
        let mut dispatcher = ToolDispatcher::new(Some(memory.clone()));
        dispatcher.register(Arc::new(OkTool));

        dispatcher.execute(&action("get_time")).await;
        assert!(memory.texts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_is_error_outcome() {
        let dispatcher = ToolDispatcher::new(None);
        let outcome = dispatcher.execute(&action("teleport")).await;
        assert_eq!(outcome.status, ToolStatus::Error);
        assert!(outcome.output.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn unregistered_tool_is_error_outcome() {
        let dispatcher = ToolDispatcher::new(None);
        let outcome = dispatcher.execute(&action("search")).await;
        assert_eq!(outcome.status, ToolStatus::Error);
        assert!(outcome.output.contains("not registered"));
    }
}
