use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking — no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "-- Migration 1: conversations and messages

CREATE TABLE conversations (
    key TEXT PRIMARY KEY,
    participant_a TEXT NOT NULL,
    participant_b TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    last_message_at TEXT
);

CREATE INDEX idx_conversations_participant_a ON conversations(participant_a);
CREATE INDEX idx_conversations_participant_b ON conversations(participant_b);

CREATE TABLE messages (
    id TEXT PRIMARY KEY,
    conversation_key TEXT NOT NULL,
    sender_id TEXT NOT NULL,
    recipient_id TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    seq INTEGER NOT NULL,
    FOREIGN KEY (conversation_key) REFERENCES conversations(key)
);

CREATE INDEX idx_messages_conversation ON messages(conversation_key, created_at DESC, seq DESC);
CREATE UNIQUE INDEX idx_messages_conversation_seq ON messages(conversation_key, seq);
",
    )])
}
