use axum::{middleware, routing::get, routing::post, Router};

use crate::auth::middleware::JwtSecret;
use crate::chat::messages;
use crate::presence;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Authenticated REST routes (JWT required — Claims extractor validates token).
    // Note: /api/messages/send/{id} has its own segment so it cannot collide
    // with the history route's {peer_id} path parameter.
    let api_routes = Router::new()
        .route(
            "/api/messages/send/{recipient_id}",
            post(messages::send_message),
        )
        .route("/api/messages/{peer_id}", get(messages::get_history))
        .route("/api/presence", get(presence::get_presence));

    // WebSocket endpoint (auth via query param, not JWT header)
    let ws_routes = Router::new().route("/ws", get(ws_handler::ws_upgrade));

    // Health check
    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(api_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
