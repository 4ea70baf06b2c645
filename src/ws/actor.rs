//! Connection lifecycle: Connecting → Authenticated → Open → Closed.
//!
//! By the time `run_connection` is entered the connection is Authenticated
//! (the handshake in `ws::handler` refused it otherwise). This actor moves it
//! to Open by registering with the presence registry, services it, and on any
//! exit path moves it to Closed by unregistering exactly once. Register and
//! unregister are each followed by an online-users broadcast.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::chat::dispatch;
use crate::presence::Connection;
use crate::state::AppState;
use crate::ws::protocol::{self, Flow};

/// Ping interval: server sends WebSocket ping every 30 seconds.
/// Prevents registry leaks from abrupt disconnects the transport never
/// reports.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong timeout: if pong not received within 10 seconds after ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the actor-per-connection pattern for an authenticated WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader loop: processes incoming frames, dispatches JSON commands
///
/// The mpsc sender is what the registry hands out: any part of the system
/// can push frames to this client without touching the socket directly.
pub async fn run_connection(socket: WebSocket, state: AppState, user_id: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Open: register, then fan out the new presence snapshot to everyone
    // (including this connection — it doubles as the initial snapshot).
    let connection = Connection::new(tx.clone());
    let connection_id = connection.id;
    state.registry.register(&user_id, connection);
    dispatch::broadcast_online_users(&state.registry);

    tracing::info!(user_id = %user_id, "WebSocket actor started");

    // Spawn writer task: forwards mpsc messages to the WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {
                    // Pong received, continue
                }
                _ => {
                    tracing::warn!("Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: process incoming WebSocket frames
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    match protocol::handle_text_message(text.as_str(), &tx, &state, &user_id)
                        .await
                    {
                        Flow::Continue => {}
                        Flow::Close => {
                            tracing::info!(user_id = %user_id, "Client requested logout");
                            break;
                        }
                    }
                }
                Message::Binary(_) => {
                    // Protocol is JSON text frames; binary is unexpected
                    tracing::debug!(user_id = %user_id, "Ignoring binary frame");
                }
                Message::Pong(_) => {
                    // Pong received — notify the ping task
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    // Respond to client pings with pong
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(user_id = %user_id, reason = ?frame, "Client initiated close");
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(user_id = %user_id, error = %e, "WebSocket receive error");
                break;
            }
            None => {
                // Stream ended — client disconnected
                tracing::info!(user_id = %user_id, "WebSocket stream ended");
                break;
            }
        }
    }

    // Closed: abort the helper tasks, unregister exactly once, and tell the
    // remaining connections who is still online. The just-closed connection's
    // entry is already gone, so the broadcast only reaches live peers.
    writer_handle.abort();
    ping_handle.abort();

    state.registry.unregister(&user_id, connection_id);
    dispatch::broadcast_online_users(&state.registry);

    tracing::info!(user_id = %user_id, "WebSocket actor stopped");
}

/// Writer task: receives messages from the mpsc channel and forwards them to
/// the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}
