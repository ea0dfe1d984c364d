//! Gateway session: handshake, resume and reconnect supervision

mod config;
mod gateway_session;
mod link;
mod notice;

pub use config::{ReconnectPolicy, SessionConfig};
pub use gateway_session::GatewaySession;
pub use notice::SessionNotice;
