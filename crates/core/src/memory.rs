//! Long-term memory collaborator trait.
//!
//! Semantic memory is an external concern. The loop only recalls ranked
//! snippets for context and offers new text for storage; both directions
//! are best-effort and must never fail a turn.

use crate::error::MemoryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A ranked snippet recalled from long-term memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnippet {
    /// The remembered text
    pub text: String,

    /// Relevance score in [0, 1], higher is better
    pub score: f32,
}

/// External long-term memory collaborator.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Search for snippets relevant to `text`, ranked by score descending,
    /// filtered to `score >= min_score`, at most `top_k` results.
    async fn search(
        &self,
        text: &str,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<MemorySnippet>, MemoryError>;

    /// Store a new memory with arbitrary metadata.
    async fn add(&self, text: &str, metadata: serde_json::Value) -> Result<(), MemoryError>;
}
