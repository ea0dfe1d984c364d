//! Gateway signal kinds

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Signal kind carried in the `s` field of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SignalKind {
    /// Event delivery, carries `sn` (server only)
    Event = 0,
    /// Handshake reply with the session id (server only)
    Hello = 1,
    /// Heartbeat request (client or server)
    Ping = 2,
    /// Heartbeat response (client or server)
    Pong = 3,
    /// Resume an existing session (client only)
    Resume = 4,
    /// Server demands a reconnect (server only)
    Reconnect = 5,
    /// Resume accepted (server only)
    ResumeAck = 6,
}

impl SignalKind {
    /// Create a `SignalKind` from its raw value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Event),
            1 => Some(Self::Hello),
            2 => Some(Self::Ping),
            3 => Some(Self::Pong),
            4 => Some(Self::Resume),
            5 => Some(Self::Reconnect),
            6 => Some(Self::ResumeAck),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether a client is allowed to send this signal
    #[must_use]
    pub const fn is_client_signal(self) -> bool {
        matches!(self, Self::Ping | Self::Pong | Self::Resume)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Event => "Event",
            Self::Hello => "Hello",
            Self::Ping => "Ping",
            Self::Pong => "Pong",
            Self::Resume => "Resume",
            Self::Reconnect => "Reconnect",
            Self::ResumeAck => "ResumeAck",
        }
    }
}

impl Serialize for SignalKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for SignalKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid signal kind: {value}")))
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}
