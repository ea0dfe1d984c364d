//! # kook-gateway
//!
//! Client for the streaming gateway: a long-lived WebSocket session that
//! performs the handshake, keeps the connection alive with heartbeats, and
//! resumes or reconnects after failures while dispatching events to handlers.

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod locator;
pub mod session;

pub use connection::ConnectionState;
pub use error::{GatewayError, GatewayResult};
pub use heartbeat::HeartbeatConfig;
pub use locator::{GatewayLocator, StaticGateway};
pub use session::{GatewaySession, ReconnectPolicy, SessionConfig, SessionNotice};
