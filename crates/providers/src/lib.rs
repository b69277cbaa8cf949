//! Model endpoint clients for Valet.
//!
//! The orchestration loop talks to the model through the `ModelClient`
//! trait from `valet-core`. This crate provides the HTTP implementation
//! for OpenAI-compatible `/chat/completions` endpoints (Mistral, OpenAI,
//! OpenRouter, Ollama, vLLM, and friends).

pub mod chat_completions;

pub use chat_completions::ChatCompletionsClient;
