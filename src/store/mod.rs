//! Durable message storage: append and ordered range-read by conversation key.
//!
//! All SQL runs inside `tokio::task::spawn_blocking` against the shared
//! rusqlite connection. `append` commits before it returns — callers rely on
//! that ordering: a message must be durably stored before delivery is
//! attempted (and is never delivered if the append fails).

use chrono::Utc;
use rusqlite::params;

use crate::db::models::StoredMessage;
use crate::db::DbPool;
use crate::error::StoreError;

/// Default page size for conversation history.
pub const DEFAULT_LIMIT: u32 = 50;
/// Maximum page size for conversation history.
pub const MAX_LIMIT: u32 = 100;

/// One page of conversation history, newest-first.
#[derive(Debug)]
pub struct HistoryPage {
    pub messages: Vec<StoredMessage>,
    pub has_more: bool,
}

/// Compute the canonical conversation key for an unordered pair of user ids.
/// The lexicographically smaller id always comes first, so both participants
/// resolve to the same stored conversation regardless of who initiates.
pub fn conversation_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}:{}", a, b)
    } else {
        format!("{}:{}", b, a)
    }
}

/// Handle to the message store. Cheap to clone; all clones share the
/// underlying connection.
#[derive(Clone)]
pub struct MessageStore {
    db: DbPool,
}

impl MessageStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Append a message to the conversation between sender and recipient,
    /// creating the conversation row on first contact.
    ///
    /// The server assigns id, timestamp, and the per-conversation sequence
    /// number inside a single transaction, so `seq` is gapless and unique
    /// per conversation.
    pub async fn append(
        &self,
        sender_id: &str,
        recipient_id: &str,
        body: &str,
    ) -> Result<StoredMessage, StoreError> {
        let db = self.db.clone();
        let sender_id = sender_id.to_string();
        let recipient_id = recipient_id.to_string();
        let body = body.to_string();

        tokio::task::spawn_blocking(move || {
            let mut conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            let tx = conn.transaction()?;

            let key = conversation_key(&sender_id, &recipient_id);
            let (participant_a, participant_b) = if sender_id <= recipient_id {
                (&sender_id, &recipient_id)
            } else {
                (&recipient_id, &sender_id)
            };

            tx.execute(
                "INSERT OR IGNORE INTO conversations (key, participant_a, participant_b)
                 VALUES (?1, ?2, ?3)",
                params![key, participant_a, participant_b],
            )?;

            let seq: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE conversation_key = ?1",
                params![key],
                |row| row.get(0),
            )?;

            let id = uuid::Uuid::now_v7().to_string();
            let created_at = Utc::now().timestamp_millis();

            tx.execute(
                "INSERT INTO messages (id, conversation_key, sender_id, recipient_id, body, created_at, seq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, key, sender_id, recipient_id, body, created_at, seq],
            )?;

            tx.execute(
                "UPDATE conversations SET last_message_at = datetime('now') WHERE key = ?1",
                params![key],
            )?;

            tx.commit()?;

            Ok(StoredMessage {
                id,
                conversation_key: key,
                sender_id,
                recipient_id,
                body,
                created_at,
                seq,
            })
        })
        .await?
    }

    /// Read one page of conversation history between two users, newest-first
    /// (`created_at DESC, seq DESC`). `before` is an exclusive created-at
    /// cursor in Unix millis; pass the `created_at` of the oldest message
    /// from the previous page to walk backwards.
    pub async fn read_conversation(
        &self,
        user_id: &str,
        peer_id: &str,
        before: Option<i64>,
        limit: u32,
    ) -> Result<HistoryPage, StoreError> {
        let db = self.db.clone();
        let key = conversation_key(user_id, peer_id);
        let before = before.unwrap_or(i64::MAX);
        let limit = limit.clamp(1, MAX_LIMIT);

        tokio::task::spawn_blocking(move || {
            let conn = db.lock().map_err(|_| StoreError::LockPoisoned)?;

            let mut stmt = conn.prepare(
                "SELECT id, conversation_key, sender_id, recipient_id, body, created_at, seq
                 FROM messages
                 WHERE conversation_key = ?1 AND created_at < ?2
                 ORDER BY created_at DESC, seq DESC
                 LIMIT ?3",
            )?;

            // Fetch one extra row to detect whether older messages remain.
            let mut messages: Vec<StoredMessage> = stmt
                .query_map(params![key, before, (limit + 1) as i64], |row| {
                    Ok(StoredMessage {
                        id: row.get(0)?,
                        conversation_key: row.get(1)?,
                        sender_id: row.get(2)?,
                        recipient_id: row.get(3)?,
                        body: row.get(4)?,
                        created_at: row.get(5)?,
                        seq: row.get(6)?,
                    })
                })?
                .collect::<Result<_, _>>()?;

            let has_more = messages.len() > limit as usize;
            messages.truncate(limit as usize);

            Ok(HistoryPage { messages, has_more })
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::conversation_key;

    #[test]
    fn conversation_key_is_order_independent() {
        assert_eq!(conversation_key("alice", "bob"), conversation_key("bob", "alice"));
        assert_eq!(conversation_key("alice", "bob"), "alice:bob");
    }

    #[test]
    fn conversation_key_handles_equal_ids() {
        assert_eq!(conversation_key("alice", "alice"), "alice:alice");
    }
}
