pub mod actor;
pub mod handler;
pub mod protocol;

/// WebSocket close codes used at the auth boundary:
/// 4001 = token expired, 4002 = token invalid.
pub const CLOSE_TOKEN_EXPIRED: u16 = 4001;
pub const CLOSE_TOKEN_INVALID: u16 = 4002;
/// Normal closure, used for explicit logout.
pub const CLOSE_NORMAL: u16 = 1000;
