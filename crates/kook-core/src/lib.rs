//! # kook-core
//!
//! Types shared by the streaming gateway and the push-delivery endpoint:
//! the signal envelope, the event model and the handler dispatcher.

pub mod dispatch;
pub mod events;
pub mod protocol;

pub use dispatch::{EventDispatcher, HandlerError, HandlerResult};
pub use events::{ChannelType, Event, EventType};
pub use protocol::{GatewayFrame, HelloPayload, PingPayload, ProtocolError, ResumePayload, SignalKind};
