//! In-memory presence registry: user id → live WebSocket connections.
//!
//! The registry is the single owner of online/offline state. The connection
//! actor is the only writer (register on open, unregister on close); the
//! delivery and broadcast paths are readers. DashMap's per-entry locking
//! keeps every operation atomic, and the entry API guarantees the core
//! invariant at every observable point: a user id is present in the map
//! iff it has at least one live connection — an empty vec is never stored.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Sender half of a connection's outbound channel. Cloning this is how any
/// part of the system pushes a frame to a specific client; the per-connection
/// writer task owns the matching receiver and the WebSocket sink.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id for one physical connection. Register/unregister are
/// keyed on this, which is what makes both idempotent: re-registering the
/// same handle or unregistering an already-removed one are no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One live connection as tracked by the registry.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub sender: ConnectionSender,
}

impl Connection {
    pub fn new(sender: ConnectionSender) -> Self {
        Self {
            id: ConnectionId::next(),
            sender,
        }
    }
}

/// Registry of online users. A user can have multiple concurrent connections
/// (multiple devices/tabs). Cheap to clone; clones share the map.
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    inner: Arc<DashMap<String, Vec<Connection>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection for a user, creating the entry on first connection.
    /// Idempotent per ConnectionId.
    pub fn register(&self, user_id: &str, connection: Connection) {
        let mut entry = self.inner.entry(user_id.to_string()).or_default();
        if !entry.iter().any(|c| c.id == connection.id) {
            entry.push(connection);
        }
        let count = entry.len();
        drop(entry);

        tracing::debug!(user_id = %user_id, connections = count, "Connection registered");
    }

    /// Remove a connection; drops the whole entry when the last connection
    /// goes away. No-op for an unknown user or an already-removed handle.
    /// The emptiness check and the removal happen under the same entry lock.
    pub fn unregister(&self, user_id: &str, connection_id: ConnectionId) {
        if let Entry::Occupied(mut occupied) = self.inner.entry(user_id.to_string()) {
            occupied.get_mut().retain(|c| c.id != connection_id);
            if occupied.get().is_empty() {
                occupied.remove();
            }
        }

        tracing::debug!(user_id = %user_id, "Connection unregistered");
    }

    /// True iff the user has at least one live connection.
    pub fn is_online(&self, user_id: &str) -> bool {
        self.inner.contains_key(user_id)
    }

    /// Snapshot of the user's connection senders at call time.
    /// Empty for offline users.
    pub fn connections_for(&self, user_id: &str) -> Vec<ConnectionSender> {
        self.inner
            .get(user_id)
            .map(|entry| entry.iter().map(|c| c.sender.clone()).collect())
            .unwrap_or_default()
    }

    /// Snapshot of all currently online user ids, for presence broadcasts.
    pub fn online_user_ids(&self) -> Vec<String> {
        self.inner.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of live connections for a user (0 if offline).
    pub fn connection_count(&self, user_id: &str) -> usize {
        self.inner.get(user_id).map(|entry| entry.len()).unwrap_or(0)
    }

    /// Run `f` for every connection sender of every online user.
    /// Used by the broadcast fan-out.
    pub fn for_each_connection(&self, mut f: impl FnMut(&str, &ConnectionSender)) {
        for entry in self.inner.iter() {
            for connection in entry.value().iter() {
                f(entry.key(), &connection.sender);
            }
        }
    }
}
