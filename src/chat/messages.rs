//! Message send and history: the REST surface plus the shared send path
//! used by both REST and the WebSocket send-message command.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::middleware::Claims;
use crate::chat::dispatch;
use crate::db::models::StoredMessage;
use crate::error::StoreError;
use crate::state::AppState;
use crate::store::DEFAULT_LIMIT;

/// Maximum message body size in bytes.
pub const MAX_BODY_BYTES: usize = 8192;

#[derive(Debug, Error)]
pub enum SendMessageError {
    /// Sender-side validation failure — nothing was persisted.
    #[error("{0}")]
    Invalid(&'static str),

    /// Persistence failed — the message was NOT sent and must not be
    /// acknowledged or dispatched.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persist a message, then hand it to the dispatcher.
///
/// Ordering contract: `append` is awaited to completion (durable ack) before
/// `dispatch_message` runs, and dispatch itself never blocks — pushes go over
/// unbounded channels into per-connection writer tasks. If the append fails
/// the dispatcher is never invoked.
pub async fn send_and_dispatch(
    state: &AppState,
    sender_id: &str,
    recipient_id: &str,
    body: &str,
) -> Result<StoredMessage, SendMessageError> {
    if recipient_id.is_empty() {
        return Err(SendMessageError::Invalid("recipient id must not be empty"));
    }
    if recipient_id == sender_id {
        return Err(SendMessageError::Invalid("cannot message yourself"));
    }
    if body.is_empty() {
        return Err(SendMessageError::Invalid("message body must not be empty"));
    }
    if body.len() > MAX_BODY_BYTES {
        return Err(SendMessageError::Invalid("message body too large"));
    }

    let stored = state.store.append(sender_id, recipient_id, body).await?;

    dispatch::dispatch_message(&state.registry, &stored);

    Ok(stored)
}

// --- REST endpoint handlers ---

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

/// POST /api/messages/send/{recipient_id} — Send a message. JWT auth required.
/// Responds 201 with the stored record (server-assigned id and timestamp)
/// once the message is durably persisted; realtime delivery is best-effort
/// and does not affect the response.
pub async fn send_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(recipient_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<StoredMessage>), StatusCode> {
    match send_and_dispatch(&state, &claims.sub, &recipient_id, &request.body).await {
        Ok(stored) => Ok((StatusCode::CREATED, Json(stored))),
        Err(SendMessageError::Invalid(reason)) => {
            tracing::debug!(sender_id = %claims.sub, reason, "Rejected send");
            Err(StatusCode::BAD_REQUEST)
        }
        Err(SendMessageError::Store(e)) => {
            tracing::error!(sender_id = %claims.sub, error = %e, "Failed to persist message");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Exclusive created-at cursor (Unix millis)
    pub before: Option<i64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    /// Newest-first
    pub messages: Vec<StoredMessage>,
    pub has_more: bool,
}

/// GET /api/messages/{peer_id}?before={millis}&limit={n} — Paginated history
/// of the conversation with `peer_id`, newest-first. JWT auth required.
pub async fn get_history(
    State(state): State<AppState>,
    claims: Claims,
    Path(peer_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, StatusCode> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    let page = state
        .store
        .read_conversation(&claims.sub, &peer_id, query.before, limit)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %claims.sub, error = %e, "Failed to read history");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(HistoryResponse {
        messages: page.messages,
        has_more: page.has_more,
    }))
}
