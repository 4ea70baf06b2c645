//! JSON wire protocol for the WebSocket channel.
//!
//! All frames are text frames holding a `type`-tagged JSON object.
//! Server-to-client events and client-to-server commands are separate enums;
//! `request_id` lets a client correlate a command with its ack or error.

use serde::{Deserialize, Serialize};

use crate::db::models::StoredMessage;

/// Events pushed from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Snapshot of all online user ids. Sent to every open connection
    /// whenever registry membership changes, and once to a connection
    /// right after it opens.
    #[serde(rename_all = "camelCase")]
    OnlineUsers { user_ids: Vec<String> },

    /// A newly persisted message, pushed to the recipient's connections only.
    #[serde(rename_all = "camelCase")]
    NewMessage { message: StoredMessage },

    /// Ack for a send-message command, delivered to the issuing connection.
    #[serde(rename_all = "camelCase")]
    MessageSent {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        message: StoredMessage,
    },

    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        code: u16,
        message: String,
    },
}

/// Commands sent from client to server over an open connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientCommand {
    #[serde(rename_all = "camelCase")]
    SendMessage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
        recipient_id: String,
        body: String,
    },

    /// Explicit logout: the server closes the connection with code 1000.
    Logout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_users_event_wire_shape() {
        let event = ServerEvent::OnlineUsers {
            user_ids: vec!["alice".into(), "bob".into()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "online-users");
        assert_eq!(json["userIds"][0], "alice");
    }

    #[test]
    fn send_message_command_parses() {
        let cmd: ClientCommand = serde_json::from_str(
            r#"{"type":"send-message","requestId":"r1","recipientId":"bob","body":"hi"}"#,
        )
        .unwrap();
        match cmd {
            ClientCommand::SendMessage {
                request_id,
                recipient_id,
                body,
            } => {
                assert_eq!(request_id.as_deref(), Some("r1"));
                assert_eq!(recipient_id, "bob");
                assert_eq!(body, "hi");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn logout_command_parses() {
        let cmd: ClientCommand = serde_json::from_str(r#"{"type":"logout"}"#).unwrap();
        assert!(matches!(cmd, ClientCommand::Logout));
    }
}
