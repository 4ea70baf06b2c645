use serde::{Deserialize, Serialize};

/// A message as persisted and as pushed over the wire.
///
/// Immutable once stored. `created_at` is server-assigned Unix millis;
/// `seq` is a per-conversation monotonic sequence used as the ordering
/// tie-breaker (and as a client-side dedup key together with `id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// UUIDv7, server-assigned
    pub id: String,
    pub conversation_key: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    /// Unix millis, server clock
    pub created_at: i64,
    /// Per-conversation monotonic sequence, starts at 1
    pub seq: i64,
}
