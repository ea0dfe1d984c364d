use super::EventType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where an event happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChannelType {
    /// Guild channel
    Group,
    /// Direct message
    Person,
    /// Broadcast to every subscriber
    Broadcast,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Event body of an event signal or a push delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub channel_type: ChannelType,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub target_id: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub msg_id: String,
    /// Milliseconds since the epoch
    #[serde(default)]
    pub msg_timestamp: i64,
    #[serde(default)]
    pub nonce: String,
    /// Type-specific fields, left undecoded
    #[serde(default)]
    pub extra: Value,
}

impl Event {
    /// Name of a system notification (`extra.type`), if any
    #[must_use]
    pub fn system_kind(&self) -> Option<&str> {
        if self.event_type != EventType::SYSTEM {
            return None;
        }
        self.extra.get("type").and_then(Value::as_str)
    }
}
