//! Model client trait: the abstraction over the remote language model.
//!
//! A `ModelClient` sends an ordered message window and returns a single
//! assistant message string. The orchestration loop never streams from the
//! model; progress is surfaced through its own event stream instead.

use crate::error::ModelError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One completion request against the model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The model identifier (e.g., "mistral-large-latest")
    pub model: String,

    /// The assembled context window
    pub messages: Vec<Message>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum output tokens
    pub max_tokens: u32,
}

/// A complete (non-streaming) response from the model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The assistant message content
    pub content: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics, when the endpoint reports them
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The model endpoint abstraction.
///
/// A non-success status or transport failure from `complete` is terminal
/// for the turn; the loop surfaces it as a single error event.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// A human-readable name for this client (e.g., "mistral", "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ModelRequest,
    ) -> std::result::Result<ModelResponse, ModelError>;

    /// Health check: can we reach the endpoint?
    async fn health_check(&self) -> std::result::Result<bool, ModelError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization() {
        let req = ModelRequest {
            model: "mistral-large-latest".into(),
            messages: vec![Message::system("You are helpful"), Message::user("Hello")],
            temperature: 0.1,
            max_tokens: 2000,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("mistral-large-latest"));
        assert!(json.contains(r#""role":"system""#));
    }
}
