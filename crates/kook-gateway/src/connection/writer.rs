//! Serialized outbound writes
//!
//! Heartbeats, pongs and resume requests all go through one lock per
//! connection so frames never interleave on the socket.

use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use futures_util::{Sink, SinkExt};
use kook_core::GatewayFrame;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can put a frame on the wire
#[async_trait]
pub trait FrameSender: Send + Sync {
    async fn send_frame(&self, frame: &GatewayFrame) -> GatewayResult<()>;
}

/// Write half of a gateway connection
pub struct FrameWriter<S> {
    sink: Mutex<S>,
    send_timeout: Duration,
}

impl<S> FrameWriter<S>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin + Send,
{
    pub fn new(sink: S) -> Self {
        Self {
            sink: Mutex::new(sink),
            send_timeout: SEND_TIMEOUT,
        }
    }

    /// Bound on waiting for the lock plus the write itself
    #[must_use]
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Close the transport; errors are ignored since the link is going away
    pub async fn close(&self) {
        let close = async {
            let mut sink = self.sink.lock().await;
            sink.close().await
        };
        if tokio::time::timeout(CLOSE_TIMEOUT, close).await.is_err() {
            tracing::debug!("Timed out closing gateway socket");
        }
    }
}

#[async_trait]
impl<S> FrameSender for FrameWriter<S>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin + Send,
{
    async fn send_frame(&self, frame: &GatewayFrame) -> GatewayResult<()> {
        let json = frame
            .to_json()
            .map_err(|e| GatewayError::ProtocolViolation(format!("unencodable frame: {e}")))?;
        let send = async {
            let mut sink = self.sink.lock().await;
            sink.send(Message::Text(json)).await
        };
        tokio::time::timeout(self.send_timeout, send)
            .await
            .map_err(|_| GatewayError::Timeout("send"))??;
        tracing::trace!(frame = %frame, "Frame sent");
        Ok(())
    }
}

impl<S> std::fmt::Debug for FrameWriter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter").finish_non_exhaustive()
    }
}
