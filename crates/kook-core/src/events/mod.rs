//! Platform events
//!
//! The event body delivered by both the streaming gateway and push delivery.

mod event;
mod event_types;

pub use event::{ChannelType, Event};
pub use event_types::EventType;
