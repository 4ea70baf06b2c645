pub mod dispatch;
pub mod messages;
