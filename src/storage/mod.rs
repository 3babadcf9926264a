use crate::config::StorageConfig;
use crate::error::{ChatError, Result};
use crate::inference::Role;
use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod types;
pub use types::{ChatSession, StoredMessage};

/// Durable, append-only message log per session
///
/// Messages are returned in insertion order and are never edited once
/// saved. Implementations must be safe to call from any task.
pub trait MessageStore: Send + Sync {
    /// Create a session and return its id
    fn create_session(&self, name: &str, system_prompt: &str) -> Result<i64>;

    /// Fetch a session's metadata
    fn get_session(&self, session_id: i64) -> Result<Option<ChatSession>>;

    /// All sessions, newest first
    fn list_sessions(&self) -> Result<Vec<ChatSession>>;

    /// Delete a session and its messages; deleting a missing session is a no-op
    fn delete_session(&self, session_id: i64) -> Result<()>;

    /// Rename a session
    fn update_session_name(&self, session_id: i64, name: &str) -> Result<()>;

    /// Replace a session's system prompt
    fn update_system_prompt(&self, session_id: i64, system_prompt: &str) -> Result<()>;

    /// Append a message to a session
    fn save_message(&self, session_id: i64, role: Role, content: &str) -> Result<()>;

    /// Messages of a session in insertion order
    fn get_messages(&self, session_id: i64) -> Result<Vec<StoredMessage>>;
}

/// Append a message from async code on the blocking thread pool
///
/// # Errors
///
/// Returns the store's error, or [`ChatError::Storage`] when the blocking
/// task panicked or was cancelled.
pub async fn save_message_blocking(
    store: &Arc<dyn MessageStore>,
    session_id: i64,
    role: Role,
    content: &str,
) -> Result<()> {
    let store = Arc::clone(store);
    let content = content.to_string();
    tokio::task::spawn_blocking(move || store.save_message(session_id, role, &content))
        .await
        .map_err(|e| ChatError::Storage(format!("Save task failed: {}", e)))?
}

/// SQLite-backed [`MessageStore`]
///
/// A connection is opened per operation, so the store can be shared across
/// tasks without additional locking.
#[derive(Debug, Clone)]
pub struct SqliteMessageStore {
    db_path: PathBuf,
}

impl SqliteMessageStore {
    /// Open the store described by `config`
    ///
    /// Uses `database_path` when set, otherwise `chat.db` in the user's data
    /// directory.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        if let Some(path) = &config.database_path {
            return Self::new_with_path(path);
        }

        let proj_dirs = ProjectDirs::from("com", "localchat", "localchat")
            .ok_or_else(|| ChatError::Storage("Could not determine data directory".into()))?;

        Self::new_with_path(proj_dirs.data_dir().join("chat.db"))
    }

    /// Open (creating if needed) the database at `db_path`
    ///
    /// # Examples
    ///
    /// ```
    /// use localchat::storage::{MessageStore, SqliteMessageStore};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SqliteMessageStore::new_with_path(dir.path().join("chat.db")).unwrap();
    /// let id = store.create_session("Chat", "").unwrap();
    /// assert!(store.get_session(id).unwrap().is_some());
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| ChatError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    /// Location of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| ChatError::Storage(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")
            .map_err(|e| ChatError::Storage(e.to_string()))?;
        Ok(conn)
    }

    fn init(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chat_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                system_prompt TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL
                    REFERENCES chat_sessions (id) ON DELETE CASCADE,
                sender TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chat_messages_session
                ON chat_messages (session_id, id);",
        )
        .context("Failed to create tables")
        .map_err(|e| ChatError::Storage(e.to_string()))?;

        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatSession> {
    let created_at: String = row.get(2)?;
    let message_count: i64 = row.get(4)?;
    Ok(ChatSession {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_timestamp(&created_at),
        system_prompt: row.get(3)?,
        message_count: message_count.max(0) as usize,
    })
}

const SESSION_COLUMNS: &str = "s.id, s.name, s.created_at, s.system_prompt,
    (SELECT count(*) FROM chat_messages m WHERE m.session_id = s.id)";

impl MessageStore for SqliteMessageStore {
    fn create_session(&self, name: &str, system_prompt: &str) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO chat_sessions (name, created_at, system_prompt) VALUES (?, ?, ?)",
            params![name, Utc::now().to_rfc3339(), system_prompt],
        )
        .context("Failed to create session")
        .map_err(|e| ChatError::Storage(e.to_string()))?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Created session {} ({})", id, name);
        Ok(id)
    }

    fn get_session(&self, session_id: i64) -> Result<Option<ChatSession>> {
        let conn = self.connect()?;
        let session = conn
            .query_row(
                &format!(
                    "SELECT {} FROM chat_sessions s WHERE s.id = ?",
                    SESSION_COLUMNS
                ),
                params![session_id],
                session_from_row,
            )
            .optional()
            .context("Failed to query session")
            .map_err(|e| ChatError::Storage(e.to_string()))?;
        Ok(session)
    }

    fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM chat_sessions s ORDER BY s.id DESC",
                SESSION_COLUMNS
            ))
            .context("Failed to prepare statement")
            .map_err(|e| ChatError::Storage(e.to_string()))?;

        let sessions = stmt
            .query_map([], session_from_row)
            .context("Failed to query sessions")
            .map_err(|e| ChatError::Storage(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read session row")
            .map_err(|e| ChatError::Storage(e.to_string()))?;

        Ok(sessions)
    }

    fn delete_session(&self, session_id: i64) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| ChatError::Storage(e.to_string()))?;

        tx.execute(
            "DELETE FROM chat_messages WHERE session_id = ?",
            params![session_id],
        )
        .context("Failed to delete messages")
        .map_err(|e| ChatError::Storage(e.to_string()))?;
        tx.execute(
            "DELETE FROM chat_sessions WHERE id = ?",
            params![session_id],
        )
        .context("Failed to delete session")
        .map_err(|e| ChatError::Storage(e.to_string()))?;

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| ChatError::Storage(e.to_string()))?;
        Ok(())
    }

    fn update_session_name(&self, session_id: i64, name: &str) -> Result<()> {
        let conn = self.connect()?;
        let updated = conn
            .execute(
                "UPDATE chat_sessions SET name = ? WHERE id = ?",
                params![name, session_id],
            )
            .context("Failed to rename session")
            .map_err(|e| ChatError::Storage(e.to_string()))?;
        if updated == 0 {
            return Err(ChatError::SessionNotFound(session_id).into());
        }
        Ok(())
    }

    fn update_system_prompt(&self, session_id: i64, system_prompt: &str) -> Result<()> {
        let conn = self.connect()?;
        let updated = conn
            .execute(
                "UPDATE chat_sessions SET system_prompt = ? WHERE id = ?",
                params![system_prompt, session_id],
            )
            .context("Failed to update system prompt")
            .map_err(|e| ChatError::Storage(e.to_string()))?;
        if updated == 0 {
            return Err(ChatError::SessionNotFound(session_id).into());
        }
        Ok(())
    }

    fn save_message(&self, session_id: i64, role: Role, content: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO chat_messages (session_id, sender, message, created_at)
            VALUES (?, ?, ?, ?)",
            params![session_id, role.as_str(), content, Utc::now().to_rfc3339()],
        )
        .context("Failed to save message")
        .map_err(|e| ChatError::Storage(e.to_string()))?;
        Ok(())
    }

    fn get_messages(&self, session_id: i64) -> Result<Vec<StoredMessage>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, sender, message, created_at
                FROM chat_messages
                WHERE session_id = ?
                ORDER BY id ASC",
            )
            .context("Failed to prepare statement")
            .map_err(|e| ChatError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(params![session_id], |row| {
                let id: i64 = row.get(0)?;
                let sender: String = row.get(1)?;
                let message: String = row.get(2)?;
                let created_at: String = row.get(3)?;
                Ok((id, sender, message, created_at))
            })
            .context("Failed to query messages")
            .map_err(|e| ChatError::Storage(e.to_string()))?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, sender, content, created_at) = row
                .context("Failed to read message row")
                .map_err(|e| ChatError::Storage(e.to_string()))?;
            messages.push(StoredMessage {
                id,
                role: sender.parse()?,
                content,
                created_at: parse_timestamp(&created_at),
            });
        }

        Ok(messages)
    }
}
