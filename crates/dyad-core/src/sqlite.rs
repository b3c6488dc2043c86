use crate::error::CoreError;
use crate::store::MessageStore;
use async_trait::async_trait;
use dyad_api::types::Message;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    id             TEXT PRIMARY KEY,
    sender         TEXT NOT NULL,
    recipient      TEXT NOT NULL,
    body           TEXT NOT NULL,
    timestamp      INTEGER NOT NULL,
    read           INTEGER NOT NULL DEFAULT 0,
    read_timestamp INTEGER
);
CREATE INDEX IF NOT EXISTS idx_messages_pair ON messages (sender, recipient, timestamp);
";

/// Durable message store. The connection is serialized behind one lock; the
/// traffic here is two participants per conversation, not a fleet.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|_| CoreError::Storage)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(|_| CoreError::Storage)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, CoreError> {
        conn.execute_batch(SCHEMA).map_err(|_| CoreError::Storage)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        sender: row.get(1)?,
        recipient: row.get(2)?,
        body: row.get(3)?,
        timestamp: row.get::<_, i64>(4)? as u64,
        read: row.get(5)?,
        read_timestamp: row.get::<_, Option<i64>>(6)?.map(|v| v as u64),
    })
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn append(&self, message: &Message) -> Result<(), CoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO messages (id, sender, recipient, body, timestamp, read, read_timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message.id,
                message.sender,
                message.recipient,
                message.body,
                message.timestamp as i64,
                message.read,
                message.read_timestamp.map(|v| v as i64),
            ],
        )
        .map_err(|_| CoreError::Storage)?;
        Ok(())
    }

    async fn history(&self, a: &str, b: &str) -> Result<Vec<Message>, CoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, sender, recipient, body, timestamp, read, read_timestamp
                 FROM messages
                 WHERE (sender = ?1 AND recipient = ?2) OR (sender = ?2 AND recipient = ?1)
                 ORDER BY timestamp ASC, id ASC",
            )
            .map_err(|_| CoreError::Storage)?;
        let messages = stmt
            .query_map(params![a, b], row_to_message)
            .map_err(|_| CoreError::Storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|_| CoreError::Storage)?;
        Ok(messages)
    }

    async fn get(&self, id: &str) -> Result<Option<Message>, CoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, sender, recipient, body, timestamp, read, read_timestamp
             FROM messages WHERE id = ?1",
            params![id],
            row_to_message,
        )
        .optional()
        .map_err(|_| CoreError::Storage)
    }

    async fn mark_read(
        &self,
        id: &str,
        read_timestamp: u64,
    ) -> Result<Option<Message>, CoreError> {
        let conn = self.conn.lock().await;
        let updated = conn
            .execute(
                "UPDATE messages SET read = 1, read_timestamp = ?2 WHERE id = ?1 AND read = 0",
                params![id, read_timestamp as i64],
            )
            .map_err(|_| CoreError::Storage)?;
        if updated == 0 {
            return Ok(None);
        }
        conn.query_row(
            "SELECT id, sender, recipient, body, timestamp, read, read_timestamp
             FROM messages WHERE id = ?1",
            params![id],
            row_to_message,
        )
        .optional()
        .map_err(|_| CoreError::Storage)
    }
}
