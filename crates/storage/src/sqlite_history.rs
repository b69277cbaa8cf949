//! SQLite chat-history backend.
//!
//! A single database file with two tables:
//! - `sessions`: one row per conversation session
//! - `messages`: append-only log of role/content rows per session
//!
//! WAL journal mode so concurrent turns can append while readers fetch
//! their context windows.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::info;
use valet_core::error::HistoryError;
use valet_core::history::HistoryStore;
use valet_core::message::{Message, Role, SessionId};

/// A durable SQLite-backed history store.
pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    /// Create a new SQLite history store from a file path.
    ///
    /// The database and tables are created automatically.
    pub async fn new(path: &str) -> Result<Self, HistoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| HistoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite history store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id         TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Storage(format!("sessions table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                iid        INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL REFERENCES sessions(id),
                role       TEXT NOT NULL,
                content    TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Storage(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id, iid)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Storage(format!("messages index: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    async fn create_session(&self, session: &SessionId) -> Result<(), HistoryError> {
        sqlx::query("INSERT OR IGNORE INTO sessions (id, created_at) VALUES (?, ?)")
            .bind(&session.0)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| HistoryError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn add_message(
        &self,
        session: &SessionId,
        role: Role,
        content: &str,
    ) -> Result<(), HistoryError> {
        // Sessions are created implicitly on first append
        self.create_session(session).await?;

        sqlx::query(
            "INSERT INTO messages (session_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.0)
        .bind(role.as_str())
        .bind(content)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn history(
        &self,
        session: &SessionId,
        limit: usize,
    ) -> Result<Vec<Message>, HistoryError> {
        let rows = sqlx::query(
            r#"
            SELECT role, content FROM messages
            WHERE session_id = ?
            ORDER BY iid DESC
            LIMIT ?
            "#,
        )
        .bind(&session.0)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HistoryError::Storage(e.to_string()))?;

        let mut messages: Vec<Message> = rows
            .iter()
            .filter_map(|row| {
                let role: String = row.get("role");
                let content: String = row.get("content");
                role.parse::<Role>().ok().map(|role| Message { role, content })
            })
            .collect();

        // Query returned newest first; callers expect chronological order
        messages.reverse();
        Ok(messages)
    }
}
