use crate::connection::ConnectionState;

/// Lifecycle notifications broadcast to session observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// A fresh session was established
    Connected { session_id: String },
    /// The server acknowledged a resume; sequence continuity is preserved
    Resumed { session_id: String, sn: u64 },
    /// A resume was answered with a new handshake and the old session dropped
    SessionReset {
        previous: Option<String>,
        session_id: String,
    },
    /// Recovery gave up; the session is disconnected until `connect()` is called
    ReconnectExhausted { attempts: u32 },
}
