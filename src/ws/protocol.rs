use axum::extract::ws::{CloseFrame, Message};
use tokio::sync::mpsc;

use crate::chat::messages::{self, SendMessageError};
use crate::proto::{ClientCommand, ServerEvent};
use crate::state::AppState;
use crate::ws::CLOSE_NORMAL;

/// What the reader loop should do after a command has been handled.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Handle an incoming text (JSON) frame: decode the command, dispatch it,
/// send the ack or error back on this connection's channel.
pub async fn handle_text_message(
    text: &str,
    tx: &mpsc::UnboundedSender<Message>,
    state: &AppState,
    user_id: &str,
) -> Flow {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Failed to decode client command");
            send_error(tx, None, 400, "Invalid command");
            return Flow::Continue;
        }
    };

    match command {
        ClientCommand::SendMessage {
            request_id,
            recipient_id,
            body,
        } => {
            handle_send_message(request_id, &recipient_id, &body, tx, state, user_id).await;
            Flow::Continue
        }
        ClientCommand::Logout => {
            // Ack with a normal close; the actor unregisters on loop exit.
            let _ = tx.send(Message::Close(Some(CloseFrame {
                code: CLOSE_NORMAL,
                reason: "Logout".into(),
            })));
            Flow::Close
        }
    }
}

/// Persist and dispatch a message sent over the socket, then ack the sender
/// on this connection. The ack carries the stored record so the sending
/// device sees the server-assigned id and timestamp, same as the REST path.
async fn handle_send_message(
    request_id: Option<String>,
    recipient_id: &str,
    body: &str,
    tx: &mpsc::UnboundedSender<Message>,
    state: &AppState,
    user_id: &str,
) {
    match messages::send_and_dispatch(state, user_id, recipient_id, body).await {
        Ok(stored) => {
            send_event(tx, &ServerEvent::MessageSent {
                request_id,
                message: stored,
            });
        }
        Err(SendMessageError::Invalid(reason)) => {
            tracing::debug!(user_id = %user_id, reason, "Rejected send over WS");
            send_error(tx, request_id, 400, reason);
        }
        Err(SendMessageError::Store(e)) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to persist message from WS");
            send_error(tx, request_id, 500, "Failed to store message");
        }
    }
}

/// Encode and send an event on this connection's channel.
fn send_event(tx: &mpsc::UnboundedSender<Message>, event: &ServerEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        let _ = tx.send(Message::Text(json.into()));
    }
}

/// Send an error event.
fn send_error(
    tx: &mpsc::UnboundedSender<Message>,
    request_id: Option<String>,
    code: u16,
    message: &str,
) {
    send_event(tx, &ServerEvent::Error {
        request_id,
        code,
        message: message.to_string(),
    });
}
