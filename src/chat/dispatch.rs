//! Delivery dispatcher and presence broadcast fan-out.
//!
//! Everything here is fire-and-forget relative to the caller: a push is an
//! unbounded mpsc send into the target connection's writer task, so it never
//! blocks, and a slow or dead peer cannot delay delivery to anyone else.
//! Callers must have durably persisted a message before dispatching it —
//! a failed push is only a missed realtime notification, never data loss.

use axum::extract::ws::Message;

use crate::db::models::StoredMessage;
use crate::presence::{ConnectionSender, PresenceRegistry};
use crate::proto::ServerEvent;

/// Encode an event and push it to one connection.
/// Returns false if the connection's writer task is gone (peer closed
/// between snapshot and push) — the caller logs and moves on.
pub fn send_event(sender: &ConnectionSender, event: &ServerEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
            return false;
        }
    };
    sender.send(Message::Text(json.into())).is_ok()
}

/// Push a persisted message to every connection of its recipient.
///
/// Offline recipient: no-op — the message is already stored and will be
/// picked up by a history read on next connect. Multi-device recipients get
/// one push per connection; clients dedup by message id.
pub fn dispatch_message(registry: &PresenceRegistry, message: &StoredMessage) {
    let connections = registry.connections_for(&message.recipient_id);
    if connections.is_empty() {
        tracing::debug!(
            recipient_id = %message.recipient_id,
            message_id = %message.id,
            "Recipient offline, skipping realtime delivery"
        );
        return;
    }

    let event = ServerEvent::NewMessage {
        message: message.clone(),
    };

    let mut delivered = 0usize;
    let mut missed = 0usize;
    for sender in &connections {
        if send_event(sender, &event) {
            delivered += 1;
        } else {
            // Connection closed after the snapshot was taken.
            missed += 1;
        }
    }

    if missed > 0 {
        tracing::warn!(
            recipient_id = %message.recipient_id,
            message_id = %message.id,
            delivered,
            missed,
            "Some recipient connections went away during dispatch"
        );
    } else {
        tracing::debug!(
            recipient_id = %message.recipient_id,
            message_id = %message.id,
            delivered,
            "Message dispatched"
        );
    }
}

/// Broadcast the current online-user snapshot to every open connection.
/// Called after every register/unregister. Best-effort: failed pushes to
/// individual peers are skipped.
pub fn broadcast_online_users(registry: &PresenceRegistry) {
    let event = ServerEvent::OnlineUsers {
        user_ids: registry.online_user_ids(),
    };

    registry.for_each_connection(|_user_id, sender| {
        let _ = send_event(sender, &event);
    });
}
