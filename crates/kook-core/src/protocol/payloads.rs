//! Signal payload types

use serde::{Deserialize, Serialize};

/// Handshake payload (s=1)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Zero on success, otherwise an authentication failure code
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub session_id: String,
}

impl HelloPayload {
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            code: 0,
            session_id: session_id.into(),
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// Description of the handshake failure codes the server is known to send
    #[must_use]
    pub const fn code_description(&self) -> &'static str {
        match self.code {
            0 => "ok",
            40100 => "missing parameters",
            40101 => "invalid token",
            40102 => "token verification failed",
            40103 => "token expired",
            _ => "unknown handshake failure",
        }
    }
}

/// Heartbeat payload (s=2 and s=3)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingPayload {
    #[serde(default)]
    pub sn: u64,
}

/// Resume request payload (s=4)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePayload {
    pub session_id: String,
    pub sn: u64,
}
