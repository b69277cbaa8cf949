//! Chat history collaborator trait.
//!
//! Durable conversation storage lives outside the core; the orchestration
//! loop only needs to append turns and read back a bounded chronological
//! window. Calls may be retried but must not be assumed atomic across the
//! call boundary.

use crate::error::HistoryError;
use crate::message::{Message, Role, SessionId};
use async_trait::async_trait;

/// External chat-history collaborator.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Ensure a session exists. Idempotent.
    async fn create_session(&self, session: &SessionId) -> Result<(), HistoryError>;

    /// Append one message to a session.
    async fn add_message(
        &self,
        session: &SessionId,
        role: Role,
        content: &str,
    ) -> Result<(), HistoryError>;

    /// The last `limit` messages of a session, in chronological order
    /// (oldest first).
    async fn history(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> Result<Vec<Message>, HistoryError>;
}
