//! In-memory backends: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use valet_core::error::{HistoryError, MemoryError};
use valet_core::history::HistoryStore;
use valet_core::memory::{MemorySnippet, MemoryStore};
use valet_core::message::{Message, Role, SessionId};

/// An in-memory chat history keyed by session id.
pub struct InMemoryHistory {
    sessions: Arc<RwLock<HashMap<String, Vec<Message>>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Total messages across all sessions (test helper).
    pub async fn message_count(&self) -> usize {
        self.sessions.read().await.values().map(Vec::len).sum()
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn create_session(&self, session: &SessionId) -> Result<(), HistoryError> {
        self.sessions
            .write()
            .await
            .entry(session.0.clone())
            .or_default();
        Ok(())
    }

    async fn add_message(
        &self,
        session: &SessionId,
        role: Role,
        content: &str,
    ) -> Result<(), HistoryError> {
        self.sessions
            .write()
            .await
            .entry(session.0.clone())
            .or_default()
            .push(Message {
                role,
                content: content.to_string(),
            });
        Ok(())
    }

    async fn history(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> Result<Vec<Message>, HistoryError> {
        let sessions = self.sessions.read().await;
        let messages = sessions
            .get(&session.0)
            .ok_or_else(|| HistoryError::SessionNotFound(session.0.clone()))?;
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }
}

/// A stored memory entry.
struct MemoryEntry {
    text: String,
    #[allow(dead_code)]
    metadata: serde_json::Value,
}

/// An in-memory keyword-scored memory store.
///
/// Relevance is a crude occurrence count normalized by text length; good
/// enough for tests and small deployments. A production deployment would
/// swap in a vector store behind the same trait.
pub struct InMemoryMemory {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
}

impl InMemoryMemory {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for InMemoryMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemory {
    async fn search(
        &self,
        text: &str,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<MemorySnippet>, MemoryError> {
        let entries = self.entries.read().await;
        let needles: Vec<String> = text
            .to_lowercase()
            .split_whitespace()
            .filter(|w| w.len() > 2)
            .map(String::from)
            .collect();

        if needles.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<MemorySnippet> = entries
            .iter()
            .filter_map(|e| {
                let haystack = e.text.to_lowercase();
                let hits = needles.iter().filter(|n| haystack.contains(*n)).count();
                if hits == 0 {
                    return None;
                }
                let score = (hits as f32 / needles.len() as f32).min(1.0);
                (score >= min_score).then(|| MemorySnippet {
                    text: e.text.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    async fn add(&self, text: &str, metadata: serde_json::Value) -> Result<(), MemoryError> {
        self.entries.write().await.push(MemoryEntry {
            text: text.to_string(),
            metadata,
        });
        Ok(())
    }
}
