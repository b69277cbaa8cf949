//! Notes executor: multi-purpose note management.
//!
//! The `action` parameter selects the operation: create, search, update,
//! delete, or categories. Backed by an in-process store; a deployment with
//! durable notes would swap in a database-backed executor behind the same
//! trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use valet_core::action::Params;
use valet_core::error::ToolError;
use valet_core::tool::{ToolExecutor, ToolName};

#[derive(Debug, Clone, Serialize)]
struct Note {
    id: u64,
    title: String,
    content: String,
    category: String,
    tags: String,
    created_at: DateTime<Utc>,
}

pub struct NotesTool {
    notes: RwLock<Vec<Note>>,
    next_id: AtomicU64,
}

impl NotesTool {
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for NotesTool {
    fn default() -> Self {
        Self::new()
    }
}

fn str_param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

fn id_param(params: &Params) -> Result<u64, ToolError> {
    match params.get("id") {
        Some(v) => v
            .as_u64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| ToolError::InvalidArguments("'id' must be a number".into())),
        None => Err(ToolError::InvalidArguments("Missing 'id' argument".into())),
    }
}

#[async_trait]
impl ToolExecutor for NotesTool {
    fn name(&self) -> ToolName {
        ToolName::ManageNotes
    }

    async fn execute(&self, params: &Params) -> Result<String, ToolError> {
        let action = str_param(params, "action")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'action' argument".into()))?;

        match action {
            "create" => {
                let note = Note {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    title: str_param(params, "title").unwrap_or("Untitled").to_string(),
                    content: str_param(params, "content").unwrap_or_default().to_string(),
                    category: str_param(params, "category").unwrap_or("General").to_string(),
                    tags: str_param(params, "tags").unwrap_or_default().to_string(),
                    created_at: Utc::now(),
                };
                let rendered = serde_json::to_string(&note).unwrap_or_default();
                self.notes.write().await.push(note);
                Ok(rendered)
            }
            "search" => {
                let needle = str_param(params, "query").unwrap_or_default().to_lowercase();
                let notes = self.notes.read().await;
                let matched: Vec<&Note> = notes
                    .iter()
                    .filter(|n| {
                        needle.is_empty()
                            || n.title.to_lowercase().contains(&needle)
                            || n.content.to_lowercase().contains(&needle)
                    })
                    .collect();
                Ok(serde_json::to_string(&matched).unwrap_or_default())
            }
            "update" => {
                let id = id_param(params)?;
                let mut notes = self.notes.write().await;
                match notes.iter_mut().find(|n| n.id == id) {
                    Some(note) => {
                        if let Some(title) = str_param(params, "title") {
                            note.title = title.to_string();
                        }
                        if let Some(content) = str_param(params, "content") {
                            note.content = content.to_string();
                        }
                        Ok(serde_json::to_string(note).unwrap_or_default())
                    }
                    None => Ok("Note not found".into()),
                }
            }
            "delete" => {
                let id = id_param(params)?;
                let mut notes = self.notes.write().await;
                let before = notes.len();
                notes.retain(|n| n.id != id);
                let deleted = notes.len() < before;
                Ok(serde_json::json!({"status": if deleted { "deleted" } else { "failed" }})
                    .to_string())
            }
            "categories" => {
                let notes = self.notes.read().await;
                let mut categories: Vec<&str> =
                    notes.iter().map(|n| n.category.as_str()).collect();
                categories.sort_unstable();
                categories.dedup();
                Ok(serde_json::to_string(&categories).unwrap_or_default())
            }
            other => Err(ToolError::InvalidArguments(format!(
                "Unknown notes action: {other}"
            ))),
        }
    }
}
