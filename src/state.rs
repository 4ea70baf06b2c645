use crate::presence::PresenceRegistry;
use crate::store::MessageStore;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Online users and their live connections
    pub registry: PresenceRegistry,
    /// Durable message storage
    pub store: MessageStore,
}
