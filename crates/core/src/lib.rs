//! # Valet Core
//!
//! Domain types, traits, and error definitions for the Valet assistant
//! runtime. This crate has **zero framework dependencies**; it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator of the orchestration loop (model endpoint,
//! tool executors, chat history, long-term memory) is defined as a trait
//! here. Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod action;
pub mod error;
pub mod event;
pub mod history;
pub mod memory;
pub mod message;
pub mod model;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use action::{Action, Params};
pub use error::{Error, HistoryError, MemoryError, ModelError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use history::HistoryStore;
pub use memory::{MemorySnippet, MemoryStore};
pub use message::{Message, Role, SessionId};
pub use model::{ModelClient, ModelRequest, ModelResponse, Usage};
pub use tool::{ToolExecutor, ToolName, ToolOutcome, ToolStatus};
