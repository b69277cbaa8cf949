//! Calendar executor: event management.
//!
//! The `action` parameter selects the operation: add, list, remove, or
//! update. Backed by an in-process store, same trade-off as the notes
//! executor.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use valet_core::action::Params;
use valet_core::error::ToolError;
use valet_core::tool::{ToolExecutor, ToolName};

#[derive(Debug, Clone, Serialize)]
struct CalendarEvent {
    id: u64,
    title: String,
    start: String,
    end: Option<String>,
    description: String,
}

pub struct CalendarTool {
    events: RwLock<Vec<CalendarEvent>>,
    next_id: AtomicU64,
}

impl CalendarTool {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for CalendarTool {
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
impl ToolExecutor for CalendarTool {
    fn name(&self) -> ToolName {
        ToolName::ManageCalendar
    }

    async fn execute(&self, params: &Params) -> Result<String, ToolError> {
        let action = str_param(params, "action")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'action' argument".into()))?;

        match action {
            "add" => {
                let start = str_param(params, "start").ok_or_else(|| {
                    ToolError::InvalidArguments("Missing 'start' argument".into())
                })?;
                let event = CalendarEvent {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    title: str_param(params, "title").unwrap_or("Untitled").to_string(),
                    start: start.to_string(),
                    end: str_param(params, "end").map(String::from),
                    description: str_param(params, "description")
                        .unwrap_or_default()
                        .to_string(),
                };
                let rendered = serde_json::to_string(&event).unwrap_or_default();
                self.events.write().await.push(event);
                Ok(rendered)
            }
            "list" => {
                let events = self.events.read().await;
                Ok(serde_json::to_string(&*events).unwrap_or_default())
            }
            "remove" => {
                let id = id_param(params)?;
                let mut events = self.events.write().await;
                let before = events.len();
                events.retain(|e| e.id != id);
                let removed = events.len() < before;
                Ok(serde_json::json!({"status": if removed { "removed" } else { "failed" }})
                    .to_string())
            }
            "update" => {
                let id = id_param(params)?;
                let mut events = self.events.write().await;
                match events.iter_mut().find(|e| e.id == id) {
                    Some(event) => {
                        if let Some(title) = str_param(params, "title") {
                            event.title = title.to_string();
                        }
                        if let Some(start) = str_param(params, "start") {
                            event.start = start.to_string();
                        }
                        if let Some(description) = str_param(params, "description") {
                            event.description = description.to_string();
                        }
                        Ok(serde_json::to_string(event).unwrap_or_default())
                    }
                    None => Ok("Event not found".into()),
                }
            }
            other => Err(ToolError::InvalidArguments(format!(
                "Unknown calendar action: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Params {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn add_then_list() {
        let tool = CalendarTool::new();
        tool.execute(&params(json!({
            "action": "add",
            "title": "Dentist",
            "start": "2026-08-12 09:00"
        })))
        .await
        .unwrap();

        let output = tool.execute(&params(json!({"action": "list"}))).await.unwrap();
        assert!(output.contains("Dentist"));
    }

    #[tokio::test]
    async fn add_requires_start() {
        let tool = CalendarTool::new();
        let result = tool
            .execute(&params(json!({"action": "add", "title": "No time"})))
            .await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn remove_reports_status() {
        let tool = CalendarTool::new();
        tool.execute(&params(
            json!({"action": "add", "title": "Gone", "start": "2026-08-12 09:00"}),
        ))
        .await
        .unwrap();

        let output = tool
            .execute(&params(json!({"action": "remove", "id": 1})))
            .await
            .unwrap();
        assert!(output.contains("removed"));
    }
}
