//! The orchestration loop.
//!
//! One [`TurnRunner::run`] call processes one user message: it assembles
//! the initial context, then repeatedly calls the model, parses its output
//! for an action, gates it through the loop detector and the validator,
//! dispatches it, appends the observation, and goes again, until a final
//! answer, the wall-clock timeout, or the step budget ends the turn.
//! Progress streams to the caller as ordered [`StepEvent`]s; every turn
//! ends with exactly one terminal `final` or `error` record.
//!
//! Each turn runs as one spawned task that suspends only at I/O
//! boundaries. The context window, loop detector, and step counter are
//! turn-scoped; concurrent turns are fully independent. Dropping the
//! event receiver cancels the turn at its next suspension point, before
//! any further tool executes.

use crate::context::{ContextBuilder, ContextInput, coalesce, normalize_history};
use crate::loop_detector::LoopDetector;
use crate::parser::{self, Extraction};
use crate::sanitize::sanitize_observation;
use crate::stream_event::StepEvent;
use crate::validator::ActionValidator;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use valet_config::AgentConfig;
use valet_core::event::{DomainEvent, EventBus};
use valet_core::history::HistoryStore;
use valet_core::memory::MemoryStore;
use valet_core::message::{Message, Role, SessionId};
use valet_core::model::{ModelClient, ModelRequest};
use valet_tools::ToolDispatcher;

/// Injected when the model announces an action in prose without emitting
/// the tool call.
const ANNOUNCEMENT_ALERT: &str = "SYSTEM ALERT: You announced an action but did not emit the \
     JSON tool call. Do not narrate. Emit the tool call now.";

/// Terminal summary when the wall-clock timeout fires.
const TIMEOUT_SUMMARY: &str =
    "Request timed out before completion. Here is my synthesis with the information gathered \
     so far.";

/// Terminal summary when the step budget is exhausted. Exceeding the
/// budget must still emit a terminal record; a turn never ends silently.
const STEP_LIMIT_SUMMARY: &str =
    "I reached the reasoning step limit for this request. Here is my synthesis with the \
     information gathered so far.";

/// Everything needed to process one user message.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Session to persist against, when history is wired up.
    pub session: Option<SessionId>,

    /// The user message.
    pub message: String,

    /// The system prompt for this turn.
    pub system_prompt: String,

    /// Caller-supplied inline history (legacy raw shapes allowed), used
    /// when no session/history store is available.
    pub inline_history: Vec<serde_json::Value>,

    /// Optional system-state snapshot (connected wallet, active sessions,
    /// recent topics), included in the window on a best-effort basis.
    pub system_state: Option<BTreeMap<String, String>>,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            session: None,
            message: message.into(),
            system_prompt: system_prompt.into(),
            inline_history: Vec::new(),
            system_state: None,
        }
    }

    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_inline_history(mut self, history: Vec<serde_json::Value>) -> Self {
        self.inline_history = history;
        self
    }

    pub fn with_system_state(mut self, state: BTreeMap<String, String>) -> Self {
        self.system_state = Some(state);
        self
    }
}

/// The turn driver. Owns the collaborators; each `run` spawns an
/// independent turn task.
pub struct TurnRunner {
    model: Arc<dyn ModelClient>,
    model_name: String,
    dispatcher: Arc<ToolDispatcher>,
    history: Option<Arc<dyn HistoryStore>>,
    memory: Option<Arc<dyn MemoryStore>>,
    events: Arc<EventBus>,
    config: AgentConfig,
}

impl TurnRunner {
    pub fn new(
        model: Arc<dyn ModelClient>,
        model_name: impl Into<String>,
        dispatcher: Arc<ToolDispatcher>,
        config: AgentConfig,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            dispatcher,
            history: None,
            memory: None,
            events: Arc::new(EventBus::default()),
            config,
        }
    }

    /// Attach a history store for durable sessions.
    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// Attach a long-term memory collaborator.
    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Use a shared event bus instead of a private one.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Process one user message. Returns the live event stream; the last
    /// record is always `final` or `error`. Dropping the receiver cancels
    /// the turn at its next suspension point.
    pub fn run(&self, request: TurnRequest) -> mpsc::Receiver<StepEvent> {
        let (tx, rx) = mpsc::channel(64);

        let turn = Turn {
            model: self.model.clone(),
            model_name: self.model_name.clone(),
            dispatcher: self.dispatcher.clone(),
            history: self.history.clone(),
            memory: self.memory.clone(),
            events: self.events.clone(),
            config: self.config.clone(),
            request,
        };

        tokio::spawn(async move {
            turn.execute(tx).await;
        });

        rx
    }
}

/// One in-flight turn. All state here is turn-scoped.
struct Turn {
    model: Arc<dyn ModelClient>,
    model_name: String,
    dispatcher: Arc<ToolDispatcher>,
    history: Option<Arc<dyn HistoryStore>>,
    memory: Option<Arc<dyn MemoryStore>>,
    events: Arc<EventBus>,
    config: AgentConfig,
    request: TurnRequest,
}

impl Turn {
    async fn execute(self, tx: mpsc::Sender<StepEvent>) {
        let started = Instant::now();
        let timeout = Duration::from_secs(self.config.turn_timeout_secs);

        self.persist_user_message().await;

        if !send(&tx, StepEvent::Info {
            content: "Initializing context and memory...".into(),
        })
        .await
        {
            return;
        }

        let system_prompt = self.system_prompt_with_memories().await;
        let history = self.load_history().await;

        let builder = ContextBuilder::new(self.config.token_budget);
        let mut window = builder.build(&ContextInput {
            system_prompt: &system_prompt,
            user_query: &self.request.message,
            history: &history,
            system_state: self.request.system_state.as_ref(),
        });

        let mut detector = LoopDetector::new(
            self.config.loop_history_depth,
            self.config.loop_repeat_threshold,
        );
        let validator = ActionValidator::new(self.config.redundancy_lookback);

        for step in 0..self.config.max_steps {
            if started.elapsed() > timeout {
                warn!(step, "Turn timed out");
                self.finish_budget_exceeded(&tx, step, TIMEOUT_SUMMARY).await;
                return;
            }

            // Cooperative cancellation: the caller went away
            if tx.is_closed() {
                debug!("Client disconnected, aborting turn");
                return;
            }

            window = coalesce(window);

            let model_request = ModelRequest {
                model: self.model_name.clone(),
                messages: window.clone(),
                temperature: self.config.temperature,
                max_tokens: self.config.max_output_tokens,
            };

            let response = match self.model.complete(model_request).await {
                Ok(response) => response,
                Err(e) => {
                    error!(error = %e, "Model call failed");
                    let _ = tx
                        .send(StepEvent::Error {
                            content: format!("Model endpoint error: {e}"),
                        })
                        .await;
                    self.events.publish(DomainEvent::TurnFailed {
                        session: self.session_string(),
                        reason: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    return;
                }
            };

            if let Some(usage) = &response.usage {
                self.events.publish(DomainEvent::ModelResponded {
                    session: self.session_string(),
                    model: response.model.clone(),
                    tokens_used: usage.total_tokens,
                    timestamp: Utc::now(),
                });
            }

            let content = response.content;
            if !send(&tx, StepEvent::Thought {
                content: content.clone(),
            })
            .await
            {
                return;
            }

            let action = match parser::extract_action(&content) {
                Extraction::Action(action) => Some(action),
                Extraction::Malformed { snippet } => {
                    debug!(
                        snippet_len = snippet.len(),
                        "Malformed action object, no action extracted"
                    );
                    None
                }
                Extraction::None => None,
            };

            if let Some(action) = action {
                // Loop gate first: the cheapest, most specific signal wins
                if let Some(reason) = detector.check(&action) {
                    window.push(Message::assistant(&content));
                    window.push(Message::user(format!(
                        "SYSTEM: Loop detected ({reason}). Provide a final answer with the \
                         information you already have."
                    )));
                    continue;
                }

                if let Err(rejection) = validator.validate(&action, &window) {
                    debug!(reason = %rejection.reason, tool = %action.tool, "Action rejected");
                    window.push(Message::assistant(&content));
                    window.push(Message::user(format!(
                        "VALIDATION ERROR: {}. {}",
                        rejection.reason, rejection.suggestion
                    )));
                    continue;
                }

                let display = action.display_input();
                if !send(&tx, StepEvent::StepStart {
                    tool: action.tool.clone(),
                    input: display.clone(),
                })
                .await
                {
                    return;
                }

                let tool_started = Instant::now();
                let outcome = self.dispatcher.execute(&action).await;
                self.events.publish(DomainEvent::ToolExecuted {
                    tool_name: action.tool.clone(),
                    success: outcome.is_success(),
                    duration_ms: tool_started.elapsed().as_millis() as u64,
                    timestamp: Utc::now(),
                });

                if !send(&tx, StepEvent::StepEnd {
                    tool: action.tool.clone(),
                    input: display,
                    output: outcome.output.clone(),
                    status: outcome.status,
                })
                .await
                {
                    return;
                }

                let observation =
                    sanitize_observation(&outcome.output, self.config.observation_max_chars);
                window.push(Message::assistant(&content));
                window.push(Message::user(format!("OBSERVATION: {observation}")));
                continue;
            }

            if parser::is_announcement(&content, &self.config.announcement) {
                debug!("Announcement without action, injecting corrective instruction");
                window.push(Message::assistant(&content));
                window.push(Message::user(ANNOUNCEMENT_ALERT.to_string()));
                continue;
            }

            self.finish_final(&tx, &content, step + 1).await;
            return;
        }

        warn!(
            max_steps = self.config.max_steps,
            "Step budget exhausted without a final answer"
        );
        self.finish_budget_exceeded(&tx, self.config.max_steps, STEP_LIMIT_SUMMARY)
            .await;
    }

    fn session_string(&self) -> Option<String> {
        self.request.session.as_ref().map(|s| s.0.clone())
    }

    /// INIT: persist the user message, best-effort.
    async fn persist_user_message(&self) {
        let (Some(history), Some(session)) = (&self.history, &self.request.session) else {
            return;
        };
        if let Err(e) = history.create_session(session).await {
            warn!(error = %e, "Failed to create session");
        }
        if let Err(e) = history
            .add_message(session, Role::User, &self.request.message)
            .await
        {
            warn!(error = %e, "Failed to persist user message");
        }
    }

    /// Recall relevant memory snippets into the system prompt, best-effort.
    async fn system_prompt_with_memories(&self) -> String {
        let mut prompt = self.request.system_prompt.clone();
        let Some(memory) = &self.memory else {
            return prompt;
        };

        match memory
            .search(
                &self.request.message,
                self.config.memory_recall_limit,
                self.config.memory_min_score,
            )
            .await
        {
            Ok(snippets) if !snippets.is_empty() => {
                debug!(count = snippets.len(), "Recalled memories for context");
                prompt.push_str("\n\nRELEVANT_MEMORIES_FROM_PAST:");
                for snippet in &snippets {
                    let clipped: String = snippet.text.chars().take(150).collect();
                    prompt.push_str("\n- ");
                    prompt.push_str(&clipped);
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Memory recall failed"),
        }
        prompt
    }

    /// Source history from the store when a session is present, else from
    /// the caller-supplied inline context.
    async fn load_history(&self) -> Vec<Message> {
        if let (Some(store), Some(session)) = (&self.history, &self.request.session) {
            match store
                .history(session, self.config.history_fetch_limit)
                .await
            {
                Ok(mut messages) => {
                    // The current user message was just persisted; the
                    // builder appends it itself, so elide the duplicate
                    if messages
                        .last()
                        .is_some_and(|m| m.role == Role::User && m.content == self.request.message)
                    {
                        messages.pop();
                    }
                    return messages;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to fetch history, falling back to inline context");
                }
            }
        }
        normalize_history(&self.request.inline_history)
    }

    /// FINAL: strip scaffolding, persist, offer to memory, emit the
    /// terminal record.
    async fn finish_final(&self, tx: &mpsc::Sender<StepEvent>, raw: &str, steps: u32) {
        let answer = strip_scaffolding(raw);

        if let Some(memory) = &self.memory {
            let clipped: String = answer.chars().take(250).collect();
            let text = format!(
                "User asked: {}\nAssistant answered: {}",
                self.request.message, clipped
            );
            if let Err(e) = memory
                .add(&text, serde_json::json!({"kind": "conversation"}))
                .await
            {
                warn!(error = %e, "Failed to store conversation snippet");
            }
        }

        if let (Some(history), Some(session)) = (&self.history, &self.request.session) {
            if let Err(e) = history
                .add_message(session, Role::Assistant, &answer)
                .await
            {
                warn!(error = %e, "Failed to persist assistant response");
            }
        }

        let _ = tx.send(StepEvent::Final { content: answer }).await;
        self.events.publish(DomainEvent::TurnCompleted {
            session: self.session_string(),
            steps,
            timestamp: Utc::now(),
        });
        info!(steps, "Turn completed");
    }

    /// Budget exhaustion (steps or wall clock) degrades to a graceful
    /// terminal `final`, never a silent stop.
    async fn finish_budget_exceeded(
        &self,
        tx: &mpsc::Sender<StepEvent>,
        steps: u32,
        summary: &str,
    ) {
        let _ = tx
            .send(StepEvent::Final {
                content: summary.to_string(),
            })
            .await;
        self.events.publish(DomainEvent::TurnCompleted {
            session: self.session_string(),
            steps,
            timestamp: Utc::now(),
        });
    }
}

async fn send(tx: &mpsc::Sender<StepEvent>, event: StepEvent) -> bool {
    tx.send(event).await.is_ok()
}

/// Strip "Final Answer:" / "Thought:" scaffolding from a final response.
fn strip_scaffolding(text: &str) -> String {
    let after_marker = match text.rsplit_once("Final Answer:") {
        Some((_, rest)) => rest,
        None => text,
    };
    let trimmed = after_marker.trim();

    // Drop a leading "Thought:" line when a real answer follows it
    if trimmed.to_lowercase().starts_with("thought:")
        && let Some((_, rest)) = trimmed.split_once('\n')
    {
        return rest.trim().to_string();
    }
    trimmed.to_string()
}
