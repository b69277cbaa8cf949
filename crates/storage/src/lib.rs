//! History and memory collaborator backends.
//!
//! The orchestration core only speaks the `HistoryStore` and `MemoryStore`
//! traits. This crate ships the reference implementations:
//!
//! - [`InMemoryHistory`] / [`InMemoryMemory`]: ephemeral, for tests and
//!   sessions where persistence isn't needed
//! - [`SqliteHistory`]: durable chat history on SQLite
//! - [`NoopMemory`]: for deployments without long-term memory

pub mod in_memory;
pub mod noop;
pub mod sqlite_history;

pub use in_memory::{InMemoryHistory, InMemoryMemory};
pub use noop::NoopMemory;
pub use sqlite_history::SqliteHistory;
