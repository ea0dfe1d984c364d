//! Event type tags
//!
//! The `type` field of an event. Message events use the message type, every
//! system notification shares [`EventType::SYSTEM`] and names itself in `extra.type`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event type tag used as the dispatcher key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(pub i32);

impl EventType {
    pub const TEXT: Self = Self(1);
    pub const IMAGE: Self = Self(2);
    pub const VIDEO: Self = Self(3);
    pub const FILE: Self = Self(4);
    pub const AUDIO: Self = Self(8);
    pub const KMARKDOWN: Self = Self(9);
    pub const CARD: Self = Self(10);
    pub const SYSTEM: Self = Self(255);

    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Whether this tag carries a user message
    #[must_use]
    pub const fn is_message(self) -> bool {
        matches!(self.0, 1..=4 | 8..=10)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.0 {
            1 => "TEXT",
            2 => "IMAGE",
            3 => "VIDEO",
            4 => "FILE",
            8 => "AUDIO",
            9 => "KMARKDOWN",
            10 => "CARD",
            255 => "SYSTEM",
            _ => "UNKNOWN",
        }
    }
}

impl From<i32> for EventType {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}
