//! No-op memory store: for deployments without long-term memory.
//!
//! Recall returns nothing, storage silently succeeds. The loop treats
//! memory as best-effort, so this backend keeps every code path alive
//! without persisting anything.

use async_trait::async_trait;
use valet_core::error::MemoryError;
use valet_core::memory::{MemorySnippet, MemoryStore};

pub struct NoopMemory;

#[async_trait]
impl MemoryStore for NoopMemory {
    async fn search(
        &self,
        _text: &str,
        _top_k: usize,
        _min_score: f32,
    ) -> Result<Vec<MemorySnippet>, MemoryError> {
        Ok(Vec::new())
    }

    async fn add(&self, _text: &str, _metadata: serde_json::Value) -> Result<(), MemoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_recalls_nothing() {
        let mem = NoopMemory;
        mem.add("anything", serde_json::json!({})).await.unwrap();
        let results = mem.search("anything", 5, 0.0).await.unwrap();
        assert!(results.is_empty());
    }
}
