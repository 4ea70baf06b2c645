pub mod registry;

pub use registry::{Connection, ConnectionId, ConnectionSender, PresenceRegistry};

use axum::{extract::State, Json};
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    pub user_ids: Vec<String>,
}

/// GET /api/presence — snapshot of currently online user ids. JWT auth required.
pub async fn get_presence(
    State(state): State<AppState>,
    _claims: Claims,
) -> Json<PresenceResponse> {
    Json(PresenceResponse {
        user_ids: state.registry.online_user_ids(),
    })
}
