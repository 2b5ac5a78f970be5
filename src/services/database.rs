use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::task;

use crate::config;
use crate::models::{Conversation, Feedback, Message, Role};

#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub async fn new() -> Result<Self> {
        let path = Self::db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Create an in-memory database (used for testing)
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn db_path() -> PathBuf {
        if let Ok(path) = std::env::var("SOLACE_DB_PATH") {
            return PathBuf::from(path);
        }
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").expect("HOME not set");
                PathBuf::from(home).join(".local/share")
            });
        data_dir.join(config::APP_NAME).join("solace.db")
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );",
        )?;

        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE chats (
                    id TEXT PRIMARY KEY,
                    owner_id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE messages (
                    id TEXT PRIMARY KEY,
                    chat_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
                );

                CREATE TABLE anonymous_sessions (
                    session_token TEXT PRIMARY KEY,
                    messages TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE settings (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX idx_chats_owner ON chats(owner_id);
                CREATE INDEX idx_chats_updated ON chats(updated_at DESC);
                CREATE INDEX idx_messages_chat ON messages(chat_id);
                CREATE INDEX idx_messages_created ON messages(created_at);

                INSERT INTO schema_version (version) VALUES (1);",
            )?;
        }

        if version < 2 {
            conn.execute_batch(
                "CREATE TABLE feedback (
                    id TEXT PRIMARY KEY,
                    body TEXT NOT NULL,
                    rating INTEGER NOT NULL,
                    account_id TEXT,
                    session_token TEXT,
                    created_at TEXT NOT NULL
                );

                UPDATE schema_version SET version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Chat CRUD ---

    pub async fn insert_chat(&self, chat: &Conversation) -> Result<()> {
        let conn = self.conn.clone();
        let chat = chat.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO chats (id, owner_id, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    chat.id,
                    chat.owner_id,
                    chat.title,
                    chat.created_at.to_rfc3339(),
                    chat.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?
    }

    pub async fn list_chats(&self, owner_id: &str) -> Result<Vec<Conversation>> {
        let conn = self.conn.clone();
        let owner_id = owner_id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, title, created_at, updated_at
                 FROM chats WHERE owner_id = ?1 ORDER BY updated_at DESC",
            )?;
            let chats = stmt
                .query_map(params![owner_id], |row| Ok(Self::row_to_chat(row)))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            Ok(chats)
        })
        .await?
    }

    pub async fn get_chat(&self, id: &str) -> Result<Option<Conversation>> {
        let conn = self.conn.clone();
        let id = id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, title, created_at, updated_at FROM chats WHERE id = ?1",
            )?;
            let result = stmt
                .query_row(params![id], |row| Ok(Self::row_to_chat(row)))
                .optional()?;
            match result {
                Some(Ok(chat)) => Ok(Some(chat)),
                Some(Err(e)) => Err(e),
                None => Ok(None),
            }
        })
        .await?
    }

    pub async fn touch_chat(&self, id: &str) -> Result<()> {
        let conn = self.conn.clone();
        let id = id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "UPDATE chats SET updated_at = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), id],
            )?;
            Ok(())
        })
        .await?
    }

    pub async fn delete_chat(&self, id: &str) -> Result<()> {
        let conn = self.conn.clone();
        let id = id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute("DELETE FROM chats WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await?
    }

    // --- Message CRUD ---

    /// Insert a message row, replacing content in place when the id is
    /// already present (optimistic entries are re-written on promotion).
    pub async fn upsert_message(&self, message: &Message) -> Result<()> {
        let chat_id = message
            .conversation_id
            .clone()
            .context("Cannot persist a message without a conversation")?;
        let conn = self.conn.clone();
        let msg = message.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO messages (id, chat_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET content = ?4",
                params![
                    msg.id,
                    chat_id,
                    msg.role.as_str(),
                    msg.content,
                    msg.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?
    }

    pub async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let conn = self.conn.clone();
        let chat_id = chat_id.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            // rowid breaks created_at ties in insertion order
            let mut stmt = conn.prepare(
                "SELECT id, chat_id, role, content, created_at
                 FROM messages WHERE chat_id = ?1 ORDER BY created_at ASC, rowid ASC",
            )?;
            let messages = stmt
                .query_map(params![chat_id], |row| Ok(Self::row_to_message(row)))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await?
    }

    // --- Anonymous sessions ---

    pub async fn upsert_anonymous_session(&self, token: &str, messages_json: &str) -> Result<()> {
        let conn = self.conn.clone();
        let token = token.to_string();
        let messages_json = messages_json.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO anonymous_sessions (session_token, messages, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)
                 ON CONFLICT(session_token) DO UPDATE SET messages = ?2, updated_at = ?3",
                params![token, messages_json, now],
            )?;
            Ok(())
        })
        .await?
    }

    pub async fn get_anonymous_session(&self, token: &str) -> Result<Option<String>> {
        let conn = self.conn.clone();
        let token = token.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let result: Option<String> = conn
                .query_row(
                    "SELECT messages FROM anonymous_sessions WHERE session_token = ?1",
                    params![token],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(result)
        })
        .await?
    }

    // --- Feedback ---

    pub async fn insert_feedback(&self, feedback: &Feedback) -> Result<()> {
        let conn = self.conn.clone();
        let fb = feedback.clone();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO feedback (id, body, rating, account_id, session_token, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    fb.id,
                    fb.body,
                    fb.rating,
                    fb.account_id,
                    fb.session_token,
                    fb.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?
    }

    // --- Settings ---

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.clone();
        let key = key.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            let result: Option<String> = conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(result)
        })
        .await?
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.clone();
        let key = key.to_string();
        let value = value.to_string();
        task::spawn_blocking(move || {
            let conn = conn.lock().unwrap();
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
            Ok(())
        })
        .await?
    }

    // --- Row helpers ---

    fn row_to_chat(row: &rusqlite::Row) -> Result<Conversation> {
        let created_str: String = row.get(3)?;
        let updated_str: String = row.get(4)?;

        Ok(Conversation {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_str)?.with_timezone(&Utc),
        })
    }

    fn row_to_message(row: &rusqlite::Row) -> Result<Message> {
        let role_str: String = row.get(2)?;
        let created_str: String = row.get(4)?;

        Ok(Message {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            role: Role::from_str(&role_str)
                .ok_or_else(|| anyhow::anyhow!("Unknown role: {}", role_str))?,
            content: row.get(3)?,
            created_at: DateTime::parse_from_rfc3339(&created_str)?.with_timezone(&Utc),
        })
    }
}
