//! Gateway signal protocol
//!
//! Every frame on the wire is a JSON envelope `{"s": kind, "d": payload, "sn": sequence}`.

mod frame;
mod payloads;
mod signal;

pub use frame::{GatewayFrame, ProtocolError};
pub use payloads::{HelloPayload, PingPayload, ResumePayload};
pub use signal::SignalKind;
